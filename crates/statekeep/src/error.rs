//! Error types for statekeep.

use thiserror::Error;

/// Result type alias for storage backend operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Errors raised by a [`StorageBackend`](crate::storage::StorageBackend).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open storage: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),
}

/// Errors that can occur while loading or saving persisted state.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage failure at `{key}`: {source}")]
    Storage {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to encode `{key}`: {reason}")]
    Encode { key: String, reason: String },

    #[error("failed to decode `{key}`: {reason}")]
    Decode { key: String, reason: String },

    /// The host state could not be converted to or from a JSON tree.
    #[error("state conversion error: {0}")]
    State(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PersistError {
    pub(crate) fn storage(key: &str, source: StorageError) -> Self {
        Self::Storage {
            key: key.to_string(),
            source,
        }
    }

    /// Storage key the failure is attributed to, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Storage { key, .. } | Self::Encode { key, .. } | Self::Decode { key, .. } => {
                Some(key)
            }
            Self::State(_) | Self::Config(_) => None,
        }
    }
}
