//! One-way password derivation

use crate::error::StoreError;

/// One-way credential derivation, injectable into
/// [`UserDirectory`](crate::UserDirectory).
///
/// The stored form is opaque to the rest of the crate; only `verify` can
/// relate it back to a plaintext password.
pub trait PasswordHasher: Send + Sync {
    /// Derive the stored form of `password`.
    fn hash(&self, password: &str) -> Result<String, StoreError>;

    /// Whether `password` matches a previously derived `hash`.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, StoreError>;
}

/// Argon2id derivation with a random 16-byte salt, the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, StoreError> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHasher as _, SaltString},
        };
        use rand::RngCore;

        let mut salt_bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| StoreError::Credential(e.to_string()))?;

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StoreError::Credential(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, StoreError> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHash, PasswordVerifier},
        };

        let parsed =
            PasswordHash::new(hash).map_err(|e| StoreError::Credential(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod hasher_tests {
    use super::*;

    #[test]
    fn derived_value_verifies_against_its_password() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash("password").unwrap();
        assert!(hasher.verify("password", &hash).unwrap());
        assert!(!hasher.verify("not the password", &hash).unwrap());
    }

    #[test]
    fn same_password_salts_differently() {
        let hasher = Argon2Hasher;
        let first = hasher.hash("password").unwrap();
        let second = hasher.hash("password").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn garbage_stored_value_is_an_error() {
        let hasher = Argon2Hasher;
        assert!(matches!(
            hasher.verify("password", "not a phc string"),
            Err(StoreError::Credential(_))
        ));
    }
}
