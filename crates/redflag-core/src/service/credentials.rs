//! Credentials trait for password hashing and opaque token handling.
//!
//! The argon2/SHA-256 adapter lives in redflag-infra.

use redflag_types::error::AuthError;

pub trait Credentials: Send + Sync {
    /// Hash a password into a self-describing (PHC string) hash.
    fn hash_password(&self, password: &str) -> Result<String, AuthError>;

    /// Check a password against a stored hash. Malformed hashes never verify.
    fn verify_password(&self, password: &str, hash: &str) -> bool;

    /// A fresh random token handed to the client (sessions, email links).
    fn generate_token(&self) -> String;

    /// Deterministic digest of a token; only this value is persisted.
    fn hash_token(&self, token: &str) -> String;
}
