//! Password hashing via bcrypt.
//!
//! Hashing is CPU-bound, so both operations run on the blocking pool and never
//! hold a lock or stall the async workers.

use super::AuthError;
use crate::config::DEFAULT_BCRYPT_COST;

/// Salted one-way hashing with a fixed work factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a secret with bcrypt.
    pub async fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let cost = self.cost;
        let plaintext = plaintext.to_owned();
        tokio::task::spawn_blocking(move || hash_password(&plaintext, cost))
            .await
            .map_err(|e| AuthError::PasswordHashingFailed(format!("hash task: {e}")))?
    }

    /// Verify a secret against a bcrypt hash.
    ///
    /// A malformed hash and a wrong secret are indistinguishable: both are `false`.
    pub async fn verify(&self, hash: &str, plaintext: &str) -> bool {
        let hash = hash.to_owned();
        let plaintext = plaintext.to_owned();
        tokio::task::spawn_blocking(move || verify_password(&plaintext, &hash))
            .await
            .unwrap_or(false)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

/// Hash a password with bcrypt at the given cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost)
        .map_err(|e| AuthError::PasswordHashingFailed(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash. Any bcrypt error counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
