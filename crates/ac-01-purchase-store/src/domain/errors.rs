//! Key-value store errors.

use shared_types::GateError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Persisted bytes could not be parsed.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },

    /// Another process holds the store.
    #[error("KV store already in use ({})", path.display())]
    Locked { path: PathBuf },
}

impl KVStoreError {
    pub(crate) fn io(err: std::io::Error) -> Self {
        KVStoreError::IOError {
            message: err.to_string(),
        }
    }
}

impl From<KVStoreError> for GateError {
    fn from(err: KVStoreError) -> Self {
        GateError::Storage(err.to_string())
    }
}
