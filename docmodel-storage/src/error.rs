//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A document with this id already exists in the collection.
    #[error("document {id} already exists in `{collection}`")]
    Conflict { collection: String, id: String },

    /// A stored row could not be decoded.
    #[error("invalid data in `{collection}`: {reason}")]
    InvalidData { collection: String, reason: String },

    /// The connection mutex was poisoned by a panicking writer.
    #[error("document store lock poisoned")]
    LockPoisoned,
}
