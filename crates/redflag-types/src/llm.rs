//! LLM request/response types.
//!
//! These types model the data shapes for a single, non-streaming
//! multimodal generation call and the errors it can produce.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One piece of the user turn: text or an inline binary attachment.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

impl ContentPart {
    pub fn text(s: impl Into<String>) -> Self {
        ContentPart::Text(s.into())
    }
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system: Option<String>,
    pub parts: Vec<ContentPart>,
    pub max_output_tokens: u32,
    pub temperature: Option<f32>,
    /// Ask the provider to constrain output to JSON when it supports it.
    pub json_output: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Other,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Stop => write!(f, "stop"),
            FinishReason::MaxTokens => write!(f, "max_tokens"),
            FinishReason::Safety => write!(f, "safety"),
            FinishReason::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
    pub model: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

/// Errors from LLM provider operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("content blocked by provider: {0}")]
    ContentBlocked(String),

    #[error("provider returned no content")]
    EmptyResponse,

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl LlmError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Network(..)
                | LlmError::Timeout
                | LlmError::RateLimited { .. }
                | LlmError::Overloaded(..)
                | LlmError::Server { .. }
        )
    }

    /// Provider-supplied delay before the next attempt, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            LlmError::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Timeout.is_transient());
        assert!(LlmError::Network("reset".into()).is_transient());
        assert!(LlmError::RateLimited { retry_after_ms: Some(10) }.is_transient());
        assert!(LlmError::Overloaded("busy".into()).is_transient());
        assert!(LlmError::Server { status: 500, message: String::new() }.is_transient());

        assert!(!LlmError::AuthenticationFailed.is_transient());
        assert!(!LlmError::InvalidRequest("bad".into()).is_transient());
        assert!(!LlmError::ContentBlocked("SAFETY".into()).is_transient());
        assert!(!LlmError::EmptyResponse.is_transient());
        assert!(!LlmError::Deserialization("eof".into()).is_transient());
    }

    #[test]
    fn test_retry_after_hint() {
        assert_eq!(LlmError::RateLimited { retry_after_ms: Some(2000) }.retry_after_ms(), Some(2000));
        assert_eq!(LlmError::Timeout.retry_after_ms(), None);
    }
}
