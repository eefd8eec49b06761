//! Error types for the registry and repository.

use docmodel_crypto::CryptoError;
use docmodel_model::CompileError;
use docmodel_storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("model `{model}`: {operation} requires an id")]
    MissingId {
        model: String,
        operation: &'static str,
    },

    #[error("model `{model}`: {operation} requires ids or a filter")]
    MissingSelector {
        model: String,
        operation: &'static str,
    },

    #[error("model `{model}`: missing `{field}` payload")]
    MissingPayload { model: String, field: &'static str },

    #[error("model `{model}`: invalid id `{id}`")]
    InvalidId { model: String, id: String },

    #[error("model `{model}`: id `{id}` is already taken")]
    DuplicateId { model: String, id: String },

    #[error("model `{model}`: invalid value for `{field}`: {reason}")]
    InvalidValue {
        model: String,
        field: String,
        reason: String,
    },

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cannot load config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl EngineError {
    pub(crate) fn invalid_value(
        model: &str,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            model: model.to_string(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_id(model: &str, id: impl Into<String>) -> Self {
        Self::InvalidId {
            model: model.to_string(),
            id: id.into(),
        }
    }

    /// Failures of the backing store or hasher, as opposed to bad requests.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Crypto(_) | Self::Serialization(_)
        )
    }
}
