//! Credential verification (one-way password hashing).
//!
//! Hashing is deliberately expensive. Nothing here caches results.

use thiserror::Error;
use tracing::debug;

/// Lowest cost factor bcrypt accepts.
pub const MIN_COST: u32 = 4;

/// Highest cost factor bcrypt accepts.
pub const MAX_COST: u32 = 31;

/// Cost used when no explicit factor is configured.
pub const DEFAULT_COST: u32 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("cost factor {0} outside {MIN_COST}..={MAX_COST}")]
    InvalidCost(u32),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// External one-way hashing capability.
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext password for storage.
    fn hash(&self, plaintext: &str) -> Result<String, CredentialError>;

    /// Check a plaintext password against a stored hash.
    ///
    /// Mismatches and unparseable hashes both yield `false`.
    fn verify(&self, plaintext: &str, stored_hash: &str) -> bool;
}

/// bcrypt-backed hasher with a fixed cost factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Result<Self, CredentialError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(CredentialError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        match bcrypt::verify(plaintext, stored_hash) {
            Ok(matched) => matched,
            Err(e) => {
                debug!(error = %e, "stored password hash could not be verified");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> BcryptHasher {
        BcryptHasher::new(MIN_COST).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let h = hasher();
        let stored = h.hash("pw12345678").unwrap();
        assert_ne!(stored, "pw12345678");
        assert!(h.verify("pw12345678", &stored));
        assert!(!h.verify("pw12345679", &stored));
    }

    #[test]
    fn hashes_are_salted() {
        let h = hasher();
        assert_ne!(h.hash("same").unwrap(), h.hash("same").unwrap());
    }

    #[test]
    fn garbage_hash_is_a_mismatch_not_an_error() {
        assert!(!hasher().verify("anything", "not-a-bcrypt-hash"));
        assert!(!hasher().verify("anything", ""));
    }

    #[test]
    fn cost_is_bounded() {
        assert_eq!(BcryptHasher::new(3).unwrap_err(), CredentialError::InvalidCost(3));
        assert!(BcryptHasher::new(32).is_err());
        assert_eq!(BcryptHasher::default().cost(), DEFAULT_COST);
    }
}
