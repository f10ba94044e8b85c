//! The shared registry store every node publishes to and reads from.
//!
//! [`RegistryStore`] is the seam between the reconciler and whatever system
//! of record backs the fleet. [`DirStore`] is the bundled implementation.

mod dir;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{PeerRecord, RegistrationFile};

pub use dir::DirStore;

/// List/fetch/create/update operations against the shared record store.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Names of every record file, in store order.
    async fn list_files(&self) -> Result<Vec<String>, StoreError>;

    /// Fetch and decode every record. A single unreadable record fails the call.
    async fn fetch_files(&self) -> Result<Vec<PeerRecord>, StoreError>;

    /// Publish a brand-new record. Fails with [`StoreError::AlreadyExists`]
    /// if the record is already present.
    async fn create_file(&self, file: &RegistrationFile) -> Result<(), StoreError>;

    /// Overwrite an existing record. Fails with [`StoreError::NotFound`]
    /// if there is nothing to overwrite.
    async fn update_file(&self, file: &RegistrationFile) -> Result<(), StoreError>;
}
