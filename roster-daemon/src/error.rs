use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by a single reconciler operation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("registry store error: {0}")]
    Store(#[from] roster_core::StoreError),

    /// `run` was called on an instance whose loop already ran.
    #[error("reconciler loop already started; create a new instance")]
    AlreadyStarted,
}

/// Error surface for the daemon runtime and its socket protocol.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reconciler error: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("daemon protocol error: {0}")]
    Protocol(String),

    #[error("daemon is not running (socket missing: {socket})")]
    DaemonNotRunning { socket: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
