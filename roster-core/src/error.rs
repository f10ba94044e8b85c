//! Error types for roster-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from registry store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, with the path that was being accessed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be decoded. Fails the whole fetch.
    #[error("failed to decode record at {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error on the write path.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// `create_file` was called for a record that already exists.
    #[error("record {file} already exists")]
    AlreadyExists { file: String },

    /// `update_file` was called for a record that does not exist.
    #[error("record {file} not found")]
    NotFound { file: String },

    /// The file name would escape the store directory.
    #[error("invalid record file name {0:?}")]
    InvalidFileName(String),

    /// The blocking worker running the store operation panicked or was cancelled.
    #[error("store task failed: {0}")]
    Task(String),
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}

/// Errors from loading or validating the node configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, with the config path for context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required setting was supplied by neither the file nor the flags.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
