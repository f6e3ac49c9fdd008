//! Password hashing and verification.
//!
//! [`CredentialHasher`] is the strategy the engine hashes and verifies secrets with.
//! [`Argon2Hasher`] is the production strategy. [`PlaintextHasher`] is a fast fake for tests.

use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::Error;

/// Hashes secrets for storage and checks presented secrets against stored hashes.
///
/// Both calls are CPU-bound; async callers run them on a blocking thread.
pub trait CredentialHasher: Send + Sync + fmt::Debug {
    fn hash(&self, secret: &str) -> Result<String, Error>;

    /// `Ok(false)` for a mismatch. `Err` only when the stored hash cannot be read.
    fn verify(&self, secret: &str, hash: &str) -> Result<bool, Error>;
}

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    /// Create Argon2 instance with these parameters.
    fn to_argon2(self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| Error::Internal {
            operation: format!("create argon2 params: {e}"),
        })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Params {
    /// Secure defaults for production (Argon2id RFC recommendations)
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Argon2id hasher. Hashes use the configured parameters; verification reads the parameters
/// embedded in the stored hash, so changing them does not invalidate existing users.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher {
    params: Argon2Params,
}

impl Argon2Hasher {
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String, Error> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = self.params.to_argon2()?;

        let hash = argon2.hash_password(secret.as_bytes(), &salt).map_err(|e| Error::Internal {
            operation: format!("hash password: {e}"),
        })?;

        Ok(hash.to_string())
    }

    fn verify(&self, secret: &str, hash: &str) -> Result<bool, Error> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| Error::Internal {
            operation: format!("parse hash: {e}"),
        })?;

        // Verification always uses params from the hash
        let argon2 = Argon2::default();
        Ok(argon2.verify_password(secret.as_bytes(), &parsed_hash).is_ok())
    }
}

/// Stores secrets with a fixed prefix and no hashing. Only for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextHasher;

const PLAINTEXT_PREFIX: &str = "plain$";

impl CredentialHasher for PlaintextHasher {
    fn hash(&self, secret: &str) -> Result<String, Error> {
        Ok(format!("{PLAINTEXT_PREFIX}{secret}"))
    }

    fn verify(&self, secret: &str, hash: &str) -> Result<bool, Error> {
        Ok(hash.strip_prefix(PLAINTEXT_PREFIX) == Some(secret))
    }
}
