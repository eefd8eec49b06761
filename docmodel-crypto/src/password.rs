//! Argon2id password hashing.

use crate::error::{CryptoError, CryptoResult};
use argon2::password_hash::{self, PasswordHash, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Size of the random salt in bytes.
pub const SALT_SIZE: usize = 16;

/// Argon2id cost parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Time cost (iterations).
    pub time_cost: u32,
    /// Parallelism factor.
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        // OWASP recommendation for Argon2id
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl HashParams {
    /// Cheap parameters for tests.
    pub fn fast() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Hashes and verifies passwords with a fixed set of parameters.
///
/// Cloning is cheap; the hasher holds only the validated parameters.
#[derive(Clone, Debug)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Fails with `InvalidParams` when argon2 rejects the cost parameters.
    pub fn new(params: &HashParams) -> CryptoResult<Self> {
        let params = Params::new(
            params.memory_cost,
            params.time_cost,
            params.parallelism,
            None,
        )
        .map_err(|e| CryptoError::InvalidParams(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes `plain` with a fresh random salt and returns the PHC string.
    pub fn hash(&self, plain: &str) -> CryptoResult<String> {
        let mut salt_bytes = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut salt_bytes);
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| CryptoError::Hashing(e.to_string()))?;

        let hash = password_hash::PasswordHasher::hash_password(
            &self.argon2(),
            plain.as_bytes(),
            &salt,
        )
        .map_err(|e| CryptoError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Checks `plain` against a stored PHC hash.
    ///
    /// A mismatch is `Ok(false)`; only an unparseable hash is an error. The
    /// parameters embedded in the hash are used, not this hasher's.
    pub fn verify(&self, plain: &str, hash: &str) -> CryptoResult<bool> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| CryptoError::MalformedHash(e.to_string()))?;
        match self.argon2().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => {
                debug!(error = %e, "Password verification failed");
                Err(CryptoError::MalformedHash(e.to_string()))
            }
        }
    }
}

/// Whether `value` parses as a PHC hash string.
pub fn is_phc_hash(value: &str) -> bool {
    PasswordHash::new(value).is_ok()
}
