//! Core type definitions for docmodel.
//!
//! This crate defines the model-agnostic types shared by the compiler,
//! storage and engine crates:
//! - Document identifiers (UUID v7)
//! - `createdAt`/`updatedAt` timestamps

mod ids;
mod timestamp;

pub use ids::{EntityId, ID_LEN};
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid document id: `{0}`")]
    InvalidId(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
