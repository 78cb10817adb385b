//! Password value object - Domain layer password handling.
//!
//! DDD: Encapsulates salted password hashing as a domain value object.
//! A password is stored as a raw Argon2id digest next to the random salt
//! it was derived with; verification re-derives and compares digests in
//! constant time.

use argon2::{
    password_hash::rand_core::{OsRng, RngCore},
    Algorithm, Argon2, Params, Version,
};
use subtle::ConstantTimeEq;

use crate::config::{
    ARGON2_MEMORY_KIB, ARGON2_OUTPUT_LEN, ARGON2_PARALLELISM, ARGON2_TIME_COST,
};
use crate::errors::{AppError, AppResult};

/// Salted password digest.
///
/// DDD: Value object - immutable, compared by value.
#[derive(Clone)]
pub struct Password {
    hash: Vec<u8>,
    salt: Vec<u8>,
}

// Don't expose digest material in debug output (security)
impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("hash", &"[REDACTED]")
            .field("salt", &"[REDACTED]")
            .finish()
    }
}

impl Password {
    /// Hash a plain-text password with a freshly generated salt of the
    /// requested length. Salts are never reused across users.
    pub fn generate(plain_text: &str, salt_length: usize) -> AppResult<Self> {
        let mut salt = vec![0u8; salt_length];
        OsRng.fill_bytes(&mut salt);

        let hash = Self::derive(plain_text.as_bytes(), &salt)?;
        Ok(Self { hash, salt })
    }

    /// Reconstruct a Password from stored digest and salt.
    pub fn from_parts(hash: Vec<u8>, salt: Vec<u8>) -> Self {
        Self { hash, salt }
    }

    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Consume the value object, yielding `(hash, salt)` for storage.
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.hash, self.salt)
    }

    /// Verify a plain-text password against this digest.
    ///
    /// The comparison does not short-circuit on the first differing byte.
    pub fn verify(&self, plain_text: &str) -> bool {
        match Self::derive(plain_text.as_bytes(), &self.salt) {
            Ok(candidate) => candidate.as_slice().ct_eq(self.hash.as_slice()).into(),
            Err(_) => false,
        }
    }

    /// Derive the Argon2id digest of `plain_text` under `salt`.
    fn derive(plain_text: &[u8], salt: &[u8]) -> AppResult<Vec<u8>> {
        let params = Params::new(
            ARGON2_MEMORY_KIB,
            ARGON2_TIME_COST,
            ARGON2_PARALLELISM,
            Some(ARGON2_OUTPUT_LEN),
        )
        .map_err(|e| AppError::internal(format!("invalid argon2 parameters: {e}")))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut digest = vec![0u8; ARGON2_OUTPUT_LEN];
        argon2
            .hash_password_into(plain_text, salt, &mut digest)
            .map_err(|e| AppError::internal(format!("password hash failed: {e}")))?;

        Ok(digest)
    }
}

impl PartialEq for Password {
    fn eq(&self, other: &Self) -> bool {
        self.salt == other.salt
            && bool::from(self.hash.as_slice().ct_eq(other.hash.as_slice()))
    }
}

impl Eq for Password {}
