//! Persistence error types

use thiserror::Error;

/// Failures of a durable key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("store I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Stored value could not be encoded or decoded
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Embedded database failure
    #[error("store backend error: {0}")]
    Backend(#[from] sled::Error),
    /// Stored bytes are not valid UTF-8
    #[error("value under '{key}' is not valid UTF-8")]
    InvalidUtf8 { key: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
