//! Cryptographic operations for Red Flag Detector.
//!
//! - `credentials`: Argon2id password hashing plus SHA-256 token digests

pub mod credentials;

pub use credentials::Argon2Credentials;
