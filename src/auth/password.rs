//! Argon2id password hashing
//!
//! Hashes are PHC strings carrying their own salt and parameters, so
//! verification needs nothing beyond the stored string.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::ForemanError;

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, ForemanError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ForemanError::Auth(format!("Failed to hash password: {e}")))
}

/// Check a password against a stored PHC hash string.
///
/// A malformed hash is an error; a wrong password is `Ok(false)`.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ForemanError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| ForemanError::Auth(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let hash = hash_password("lead-by-example").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("lead-by-example", &hash).unwrap());
        assert!(!verify_password("follow-by-example", &hash).unwrap());
    }

    #[test]
    fn test_salts_differ_between_hashes() {
        let first = hash_password("same-input").unwrap();
        let second = hash_password("same-input").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("same-input", &first).unwrap());
        assert!(verify_password("same-input", &second).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error_not_a_mismatch() {
        assert!(verify_password("anything", "plaintext-not-phc").is_err());
    }
}
