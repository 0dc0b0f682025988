//! Shared domain types for Red Flag Detector.
//!
//! This crate contains the core domain types used across the service:
//! users, chats, uploads, analysis results, usage counters, LLM request
//! shapes, configuration, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod analysis;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod upload;
pub mod usage;
pub mod user;
