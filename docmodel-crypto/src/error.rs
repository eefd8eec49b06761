//! Error types for password hashing.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while hashing or verifying a password.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The configured Argon2 parameters are out of range.
    #[error("invalid hash parameters: {0}")]
    InvalidParams(String),

    /// Hashing failed.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// A stored value is not a PHC hash string.
    #[error("malformed password hash: {0}")]
    MalformedHash(String),
}
