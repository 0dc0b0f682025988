//! Transactional email delivery.
//!
//! - [`HttpMailer`] posts to a Resend-compatible `POST {base}/emails` API.
//! - [`LogMailer`] records recipient and subject in the log and drops the
//!   body. Used when no email API key is configured.
//! - [`AppMailer`] selects one of the two at startup.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use redflag_core::email::{Mailer, OutgoingEmail};
use redflag_types::config::EmailConfig;
use redflag_types::error::MailError;

/// JSON body accepted by the email API.
#[derive(Debug, Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

pub struct HttpMailer {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_key: SecretString, base_url: &str, from: String) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| MailError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            from,
        })
    }

    fn body<'a>(&'a self, email: &'a OutgoingEmail) -> SendEmailBody<'a> {
        SendEmailBody {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            text: &email.text,
            html: &email.html,
        }
    }
}

impl Mailer for HttpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.body(email))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(subject = %email.subject, "email sent");
            return Ok(());
        }

        let detail: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(300)
            .collect();
        if status.is_client_error() {
            Err(MailError::Rejected(format!("HTTP {status}: {detail}")))
        } else {
            Err(MailError::Transport(format!("HTTP {status}: {detail}")))
        }
    }
}

/// Mailer that only logs. Bodies carry single-use tokens and are never
/// written out.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "email delivery disabled; message not sent"
        );
        Ok(())
    }
}

/// Mailer chosen at startup from configuration.
pub enum AppMailer {
    Http(HttpMailer),
    Log(LogMailer),
}

impl AppMailer {
    /// Build an [`HttpMailer`] when an API key is available, else a
    /// [`LogMailer`].
    pub fn from_config(config: &EmailConfig, api_key: Option<String>) -> Result<Self, MailError> {
        match api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => Ok(AppMailer::Http(HttpMailer::new(
                SecretString::from(key),
                &config.api_base_url,
                config.from.clone(),
            )?)),
            None => {
                tracing::warn!(
                    env = %config.api_key_env,
                    "no email API key configured; emails will only be logged"
                );
                Ok(AppMailer::Log(LogMailer))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppMailer::Http(_) => "http",
            AppMailer::Log(_) => "log",
        }
    }
}

impl Mailer for AppMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        match self {
            AppMailer::Http(mailer) => mailer.send(email).await,
            AppMailer::Log(mailer) => mailer.send(email).await,
        }
    }
}
