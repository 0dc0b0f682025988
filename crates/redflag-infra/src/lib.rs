//! Infrastructure layer for Red Flag Detector.
//!
//! Contains implementations of the traits defined in `redflag-core`:
//! SQLite repositories, the Gemini LLM client, the local file store, the
//! transactional mailer, and argon2/SHA-256 credentials. Also loads
//! `AppConfig` from the data directory.

pub mod config;
pub mod crypto;
pub mod email;
pub mod llm;
pub mod sqlite;
pub mod storage;
