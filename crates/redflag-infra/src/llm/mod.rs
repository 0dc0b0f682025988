//! LLM provider implementations.
//!
//! Contains the Gemini implementation of the [`LlmProvider`] trait defined
//! in `redflag-core`, a factory ([`create_provider`]) that builds it from
//! [`LlmConfig`], and [`UnconfiguredProvider`] for running without an API key.

pub mod gemini;

use std::time::Duration;

use secrecy::SecretString;

use redflag_core::llm::{BoxLlmProvider, LlmProvider};
use redflag_types::config::LlmConfig;
use redflag_types::llm::{GenerateRequest, GenerateResponse, LlmError};

use self::gemini::GeminiProvider;

/// Create a [`BoxLlmProvider`] from [`LlmConfig`].
///
/// # Errors
///
/// Returns [`LlmError::AuthenticationFailed`] when no API key is provided,
/// or [`LlmError::Network`] if the HTTP client cannot be built.
pub fn create_provider(config: &LlmConfig, api_key: Option<&str>) -> Result<BoxLlmProvider, LlmError> {
    let key = api_key
        .filter(|k| !k.trim().is_empty())
        .ok_or(LlmError::AuthenticationFailed)?;

    let provider = GeminiProvider::new(
        SecretString::from(key.to_string()),
        config.model.clone(),
        Duration::from_secs(config.timeout_secs.max(1)),
    )?
    .with_base_url(config.base_url.clone());

    tracing::debug!(provider = "gemini", model = %config.model, "LLM provider created");
    Ok(BoxLlmProvider::new(provider))
}

/// Stand-in used when no API key is configured. Every call fails with
/// [`LlmError::AuthenticationFailed`], so analyses surface as a permanent
/// AI failure while the rest of the service keeps working.
pub struct UnconfiguredProvider {
    model: String,
}

impl UnconfiguredProvider {
    pub fn new(model: String) -> Self {
        Self { model }
    }
}

impl LlmProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, _request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        Err(LlmError::AuthenticationFailed)
    }
}
