//! Repository trait definitions.
//!
//! Implementations live in redflag-infra (SQLite). All traits use native
//! async fn in traits (RPITIT, Rust 2024 edition).

pub mod chat;
pub mod upload;
pub mod usage;
pub mod user;
