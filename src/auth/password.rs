//! Password hashing and verification
//!
//! Admin passwords are stored as bcrypt hashes.

use crate::error::AppError;
use bcrypt::{hash, verify};
use tracing::warn;

/// Work factor for newly created hashes
const HASH_COST: u32 = 10;

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, HASH_COST)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a stored hash. A malformed hash never matches.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match verify(password, stored_hash) {
        Ok(valid) => valid,
        Err(e) => {
            warn!("Stored admin password hash is unusable: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hashed = hash_password("correct horse").unwrap();
        assert!(hashed.starts_with("$2"));
        assert!(verify_password("correct horse", &hashed));
        assert!(!verify_password("wrong horse", &hashed));
    }

    #[test]
    fn test_plaintext_hash_never_matches() {
        assert!(!verify_password("secret", "secret"));
    }
}
