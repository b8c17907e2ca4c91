//! Error types for tix Batch

use std::path::PathBuf;

/// Result alias for batch operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Batch model and log file failures
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Date-valued field could not be parsed
    #[error("invalid date for '{key}': {value}")]
    InvalidDate {
        /// Field name
        key: String,
        /// Unparsed value
        value: String,
    },

    /// Log file could not be read or written
    #[error("batch log {path}: {source}")]
    Io {
        /// Log file path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Log file is not a batch document
    #[error("batch log {path} is not valid batch json: {source}")]
    Json {
        /// Log file path
        path: PathBuf,
        /// Parser failure
        #[source]
        source: serde_json::Error,
    },
}

impl BatchError {
    /// Create I/O error for a path
    #[inline]
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
