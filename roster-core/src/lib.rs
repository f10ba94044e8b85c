//! Roster core library — peer record types, staleness policy, registry store.
//!
//! - [`types`] — node names, peer records and registration payloads
//! - [`health`] — staleness filter applied on every refresh
//! - [`store`] — [`RegistryStore`] trait and the directory-backed [`DirStore`]
//! - [`config`] — YAML config loading and validation
//! - [`error`] — [`StoreError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod health;
pub mod store;
pub mod types;

pub use config::{Config, ConfigFile};
pub use error::{ConfigError, StoreError};
pub use store::{DirStore, RegistryStore};
pub use types::{CommitMessage, NodeName, PeerRecord, RegistrationFile};
