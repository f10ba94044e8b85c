//! Roster daemon: the target registry reconciler and the process hosting it.
//!
//! - [`reconciler`] — registration/refresh loop over a [`roster_core::RegistryStore`]
//! - [`runtime`] — reconciler + Unix status socket + ctrl-c handling
//! - [`protocol`] — newline-delimited JSON client for the status socket

mod error;
pub mod paths;
pub mod protocol;
pub mod reconciler;
mod runtime;

pub use error::{DaemonError, ReconcileError};
pub use protocol::{
    request_status, request_stop, request_targets, send_request, DaemonRequest, DaemonResponse,
    StatusPayload, TargetsPayload,
};
pub use reconciler::{Reconciler, ReconcilerConfig, TargetManager};
pub use runtime::{run, serve, start_blocking};
