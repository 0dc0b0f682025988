//! GeminiProvider -- concrete [`LlmProvider`] for Google Gemini.
//!
//! Sends non-streaming requests to `/v1beta/models/{model}:generateContent`
//! with the `x-goog-api-key` header. HTTP and transport failures are mapped
//! onto [`LlmError`] so the retry layer can tell transient failures from
//! permanent ones.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::{ExposeSecret, SecretString};

use redflag_core::llm::LlmProvider;
use redflag_types::llm::{
    ContentPart, FinishReason, GenerateRequest, GenerateResponse, LlmError, Usage,
};

use super::types::{
    GeminiContent, GeminiErrorBody, GeminiPart, GeminiRequest, GeminiResponse, GenerationConfig,
    InlineData,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini LLM provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, model: String, timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
        })
    }

    /// Override the base URL (proxies, regional endpoints, tests).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

// GeminiProvider intentionally does NOT derive Debug.

/// Convert a generic [`GenerateRequest`] into a [`GeminiRequest`].
pub(crate) fn to_gemini_request(request: &GenerateRequest) -> GeminiRequest {
    let parts = request
        .parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => GeminiPart {
                text: Some(text.clone()),
                ..GeminiPart::default()
            },
            ContentPart::InlineData { mime_type, data } => GeminiPart {
                inline_data: Some(InlineData {
                    mime_type: mime_type.clone(),
                    data: BASE64.encode(data),
                }),
                ..GeminiPart::default()
            },
        })
        .collect();

    GeminiRequest {
        system_instruction: request.system.as_ref().map(|system| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: Some(system.clone()),
                ..GeminiPart::default()
            }],
        }),
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GenerationConfig {
            max_output_tokens: request.max_output_tokens,
            temperature: request.temperature,
            response_mime_type: request
                .json_output
                .then(|| "application/json".to_string()),
        },
    }
}

/// `RetryInfo.retryDelay` (e.g. `"7s"` or `"1.5s"`) from an error body.
fn retry_delay_from_body(body: &str) -> Option<u64> {
    let parsed: GeminiErrorBody = serde_json::from_str(body).ok()?;
    parsed.error.details.iter().find_map(|detail| {
        let delay = detail.get("retryDelay")?.as_str()?;
        let secs: f64 = delay.strip_suffix('s')?.parse().ok()?;
        (secs >= 0.0).then(|| (secs * 1000.0) as u64)
    })
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<GeminiErrorBody>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(status) => format!("{status}: {}", parsed.error.message),
            None => parsed.error.message,
        },
        Err(_) => body.chars().take(500).collect(),
    }
}

/// Map a non-success HTTP status onto an [`LlmError`].
///
/// `retry_after` is the raw `Retry-After` header (seconds), if present.
pub(crate) fn map_status_error(status: u16, retry_after: Option<&str>, body: &str) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthenticationFailed,
        400 | 404 | 413 => LlmError::InvalidRequest(error_message(body)),
        429 => {
            let header_ms = retry_after
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs.saturating_mul(1000));
            LlmError::RateLimited {
                retry_after_ms: header_ms.or_else(|| retry_delay_from_body(body)),
            }
        }
        503 | 529 => LlmError::Overloaded(error_message(body)),
        500..=599 => LlmError::Server {
            status,
            message: error_message(body),
        },
        _ => LlmError::InvalidRequest(format!("HTTP {status}: {}", error_message(body))),
    }
}

fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("STOP") | None => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::MaxTokens,
        Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII") => {
            FinishReason::Safety
        }
        Some(_) => FinishReason::Other,
    }
}

/// Turn a successful response body into a [`GenerateResponse`].
pub(crate) fn from_gemini_response(
    response: GeminiResponse,
    requested_model: &str,
) -> Result<GenerateResponse, LlmError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.clone())
    {
        return Err(LlmError::ContentBlocked(reason));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?;
    let finish_reason = map_finish_reason(candidate.finish_reason.as_deref());

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(match finish_reason {
            FinishReason::Safety => LlmError::ContentBlocked(
                candidate.finish_reason.unwrap_or_else(|| "SAFETY".to_string()),
            ),
            _ => LlmError::EmptyResponse,
        });
    }

    let usage = response.usage_metadata.unwrap_or_default();
    Ok(GenerateResponse {
        text,
        model: response
            .model_version
            .unwrap_or_else(|| requested_model.to_string()),
        finish_reason,
        usage: Usage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        },
    })
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let body = to_gemini_request(request);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Network(format!("HTTP request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let error_body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), "gemini request failed");
            return Err(map_status_error(
                status.as_u16(),
                retry_after.as_deref(),
                &error_body,
            ));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Deserialization(format!("failed to parse response: {e}"))
            }
        })?;

        from_gemini_response(gemini_response, &self.model)
    }
}
