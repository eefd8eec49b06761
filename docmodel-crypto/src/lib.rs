//! Password hashing for docmodel.
//!
//! Password fields are stored as Argon2id hashes in PHC string form
//! (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`), so the parameters used for
//! a hash travel with it and verification keeps working after the configured
//! parameters change.

mod error;
mod password;

pub use error::{CryptoError, CryptoResult};
pub use password::{is_phc_hash, HashParams, PasswordHasher, SALT_SIZE};
