//! Global configuration types.
//!
//! `AppConfig` represents the top-level `config.toml`. Every section and
//! field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::upload::MAX_UPLOAD_BYTES;
use crate::usage::UsageLimits;
use crate::user::UserType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub retry: RetryConfig,
    pub limits: LimitsConfig,
    pub uploads: UploadConfig,
    pub email: EmailConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL used in email links.
    pub app_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            app_url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Overrides `sqlite://{data_dir}/redflag.db` when set.
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            max_output_tokens: 2048,
            temperature: 0.2,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            multiplier: 2.0,
            max_backoff_ms: 8_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub guest: UsageLimits,
    pub regular: UsageLimits,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            guest: UsageLimits { daily: 3, monthly: 20 },
            regular: UsageLimits { daily: 10, monthly: 100 },
        }
    }
}

impl LimitsConfig {
    pub fn for_user_type(&self, user_type: UserType) -> UsageLimits {
        match user_type {
            UserType::Guest => self.guest,
            UserType::Regular => self.regular,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
    pub max_attachments: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            max_attachments: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub from: String,
    pub api_base_url: String,
    /// Name of the environment variable holding the email API key. When
    /// the variable is unset, emails are written to the log instead.
    pub api_key_env: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from: "Red Flag Detector <no-reply@redflag.local>".to_string(),
            api_base_url: "https://api.resend.com".to_string(),
            api_key_env: "RESEND_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_days: i64,
    pub verify_token_ttl_hours: i64,
    pub reset_token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_days: 30,
            verify_token_ttl_hours: 24,
            reset_token_ttl_minutes: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.limits.guest.daily, 3);
        assert_eq!(config.uploads.max_bytes, MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
[llm]
model = "gemini-1.5-pro"

[limits.regular]
daily = 50
monthly = 500
"#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "gemini-1.5-pro");
        assert_eq!(config.llm.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.limits.for_user_type(UserType::Regular).daily, 50);
        assert_eq!(config.limits.for_user_type(UserType::Guest).daily, 3);
    }
}
