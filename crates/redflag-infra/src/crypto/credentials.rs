//! Argon2id password hashing and opaque token handling.
//!
//! Implements the `Credentials` trait from `redflag-core`. Passwords are
//! stored as PHC strings; session and email tokens are 32 random bytes,
//! hex-encoded, and persisted only as lowercase hex SHA-256 digests.

use aes_gcm::aead::OsRng;
use aes_gcm::aead::rand_core::RngCore;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sha2::{Digest, Sha256};

use redflag_core::service::credentials::Credentials;
use redflag_types::error::AuthError;

const TOKEN_BYTES: usize = 32;
const SALT_BYTES: usize = 16;

#[derive(Clone, Default)]
pub struct Argon2Credentials;

impl Argon2Credentials {
    pub fn new() -> Self {
        Self
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl Credentials for Argon2Credentials {
    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let mut salt_bytes = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|_| AuthError::Hashing)?;

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::Hashing)
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    fn generate_token(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex(&bytes)
    }

    fn hash_token(&self, token: &str) -> String {
        format!("{:x}", Sha256::digest(token.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let creds = Argon2Credentials::new();
        let hash = creds.hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(creds.verify_password("correct horse battery", &hash));
        assert!(!creds.verify_password("wrong", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let creds = Argon2Credentials::new();
        let a = creds.hash_password("same-password").unwrap();
        let b = creds.hash_password("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let creds = Argon2Credentials::new();
        assert!(!creds.verify_password("anything", "not-a-phc-string"));
        assert!(!creds.verify_password("anything", ""));
    }

    #[test]
    fn test_tokens_are_random_hex() {
        let creds = Argon2Credentials::new();
        let a = creds.generate_token();
        let b = creds.generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_hash_known_value() {
        let creds = Argon2Credentials::new();
        assert_eq!(
            creds.hash_token(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(creds.hash_token("abc"), creds.hash_token("abc"));
    }
}
