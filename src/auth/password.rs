//! Password hashing and verification.
//!
//! Digests are argon2id PHC strings (`$argon2id$v=19$...`), salt included.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password cannot be empty")]
    InvalidInput,

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::InvalidInput);
    }

    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check `password` against a stored digest.
///
/// Never fails: malformed digests and empty input simply do not match.
pub fn verify_password(password: &str, digest: &str) -> bool {
    if password.is_empty() || digest.is_empty() {
        return false;
    }
    match PasswordHash::new(digest) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Digest of a password nobody knows.
///
/// Verified against when a login names an unknown account so that both
/// branches cost one hash computation.
pub fn dummy_digest() -> &'static str {
    static DUMMY: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    DUMMY.get_or_init(|| hash_password("dummy-password-for-unknown-accounts").unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let digest = hash_password("mypassword123").unwrap();
        assert!(digest.starts_with("$argon2"));
        assert!(verify_password("mypassword123", &digest));
        assert!(!verify_password("wrongpassword", &digest));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let a = hash_password("hunter22").unwrap();
        let b = hash_password("hunter22").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("hunter22", &a));
        assert!(verify_password("hunter22", &b));
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(matches!(hash_password(""), Err(PasswordError::InvalidInput)));
    }

    #[test]
    fn test_malformed_digest_is_false() {
        assert!(!verify_password("secret", "not-a-digest"));
        assert!(!verify_password("secret", ""));
        assert!(!verify_password("secret", "$2b$12$legacybcryptlookingvalue"));
    }

    #[test]
    fn test_dummy_digest_never_matches_user_input() {
        assert!(!dummy_digest().is_empty());
        assert!(!verify_password("password", dummy_digest()));
    }
}
