//! Google Gemini LLM provider implementation.
//!
//! This module provides the [`GeminiProvider`] which implements the
//! [`LlmProvider`](redflag_core::llm::LlmProvider) trait for the Gemini
//! `generateContent` API, including inline image and PDF parts.

pub mod client;
pub mod types;

pub use client::GeminiProvider;
