//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use redflag_types::error::{AnalysisError, AuthError, ChatError, UploadError, UsageError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Auth(AuthError),
    Upload(UploadError),
    Usage(UsageError),
    Chat(ChatError),
    Analysis(AnalysisError),
    /// Missing or malformed credentials.
    Unauthorized(String),
    /// Malformed request body or parameters.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}

impl From<UploadError> for AppError {
    fn from(e: UploadError) -> Self {
        AppError::Upload(e)
    }
}

impl From<UsageError> for AppError {
    fn from(e: UsageError) -> Self {
        AppError::Usage(e)
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Usage(usage) => AppError::Usage(usage),
            other => AppError::Analysis(other),
        }
    }
}

/// Status, machine code, client message and optional details.
struct Mapped {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl Mapped {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    /// A 500 whose cause is logged but not sent to the client.
    fn internal(cause: &dyn std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "An internal error occurred",
        )
    }
}

fn map_usage(e: &UsageError) -> Mapped {
    match e {
        UsageError::DailyLimitReached { limit, resets_at }
        | UsageError::MonthlyLimitReached { limit, resets_at } => {
            let period = if matches!(e, UsageError::DailyLimitReached { .. }) {
                "day"
            } else {
                "month"
            };
            Mapped {
                details: Some(json!({
                    "period": period,
                    "limit": limit,
                    "resets_at": resets_at.to_rfc3339(),
                })),
                ..Mapped::new(StatusCode::TOO_MANY_REQUESTS, "USAGE_LIMIT_REACHED", e.to_string())
            }
        }
        UsageError::StorageError(_) => Mapped::internal(e),
    }
}

impl AppError {
    fn mapped(&self) -> Mapped {
        use StatusCode as S;

        match self {
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => {
                    Mapped::new(S::UNAUTHORIZED, "INVALID_CREDENTIALS", e.to_string())
                }
                AuthError::InvalidSession => Mapped::new(S::UNAUTHORIZED, "UNAUTHORIZED", e.to_string()),
                AuthError::EmailTaken => Mapped::new(S::CONFLICT, "EMAIL_TAKEN", e.to_string()),
                AuthError::InvalidEmail | AuthError::WeakPassword { .. } => {
                    Mapped::new(S::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                AuthError::InvalidToken => Mapped::new(S::BAD_REQUEST, "INVALID_TOKEN", e.to_string()),
                AuthError::Hashing | AuthError::StorageError(_) | AuthError::Mail(_) => {
                    Mapped::internal(e)
                }
            },
            AppError::Upload(e) => match e {
                UploadError::Empty => Mapped::new(S::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),
                UploadError::TooLarge { max_bytes } => Mapped {
                    details: Some(json!({ "max_bytes": max_bytes })),
                    ..Mapped::new(S::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE", e.to_string())
                },
                UploadError::UnsupportedType(_) | UploadError::TypeMismatch { .. } => {
                    Mapped::new(S::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_FILE_TYPE", e.to_string())
                }
                UploadError::NotFound => Mapped::new(S::NOT_FOUND, "FILE_NOT_FOUND", e.to_string()),
                UploadError::StorageError(_) => Mapped::internal(e),
            },
            AppError::Usage(e) => map_usage(e),
            AppError::Chat(e) => match e {
                ChatError::NotFound => Mapped::new(S::NOT_FOUND, "CHAT_NOT_FOUND", e.to_string()),
                ChatError::MessageNotFound => {
                    Mapped::new(S::NOT_FOUND, "MESSAGE_NOT_FOUND", e.to_string())
                }
                ChatError::Forbidden => Mapped::new(S::FORBIDDEN, "FORBIDDEN", e.to_string()),
                ChatError::InvalidVoteTarget => {
                    Mapped::new(S::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                ChatError::StorageError(_) => Mapped::internal(e),
            },
            AppError::Analysis(e) => match e {
                AnalysisError::EmptySubmission | AnalysisError::Validation(_) => {
                    Mapped::new(S::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                AnalysisError::NotFound => Mapped::new(S::NOT_FOUND, "NOT_FOUND", e.to_string()),
                AnalysisError::Forbidden => Mapped::new(S::FORBIDDEN, "FORBIDDEN", e.to_string()),
                AnalysisError::Usage(usage) => map_usage(usage),
                AnalysisError::LlmTransient(cause) => {
                    tracing::warn!(error = %cause, "AI provider unavailable");
                    Mapped::new(
                        S::SERVICE_UNAVAILABLE,
                        "AI_UNAVAILABLE",
                        "The analysis service is temporarily unavailable. Please try again shortly.",
                    )
                }
                AnalysisError::LlmPermanent(cause) => {
                    tracing::error!(error = %cause, "AI request failed");
                    Mapped::new(
                        S::BAD_GATEWAY,
                        "AI_REQUEST_FAILED",
                        "The analysis request could not be completed.",
                    )
                }
                AnalysisError::Parse(_) => Mapped::new(
                    S::BAD_GATEWAY,
                    "ANALYSIS_PARSE_FAILED",
                    "The analysis could not be read. Please try again.",
                ),
                AnalysisError::StorageError(_) => Mapped::internal(e),
            },
            AppError::Unauthorized(msg) => Mapped::new(S::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Validation(msg) => Mapped::new(S::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => Mapped::internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mapped = self.mapped();
        let retry_after = retry_after_secs(&mapped);

        let body = crate::http::response::ApiResponse::error(mapped.code, mapped.message, mapped.details);
        let body = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"data":null,"errors":[{"code":"SERIALIZATION_ERROR","message":"Failed to serialize response"}]}"#
                .to_string()
        });

        let mut response = (
            mapped.status,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Seconds until a usage window resets, for the `Retry-After` header.
fn retry_after_secs(mapped: &Mapped) -> Option<i64> {
    let resets_at = mapped.details.as_ref()?.get("resets_at")?.as_str()?;
    let resets_at = chrono::DateTime::parse_from_rfc3339(resets_at).ok()?;
    Some((resets_at.timestamp() - chrono::Utc::now().timestamp()).max(1))
}
