//! Red-flag analysis handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use redflag_core::service::analysis::AnalyzeRequest;
use redflag_types::analysis::ContentCategory;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::response::{ApiResponse, RequestMeta};
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct AnalyzeBody {
    pub text: Option<String>,
    #[serde(default)]
    pub attachment_ids: Vec<Uuid>,
    /// Any spelling `ContentCategory` parses (e.g. "job_posting", "Job Posting").
    pub category: Option<String>,
    pub chat_id: Option<Uuid>,
}

impl AnalyzeBody {
    fn into_request(self) -> Result<AnalyzeRequest, AppError> {
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<ContentCategory>().map_err(AppError::Validation)?),
        };
        Ok(AnalyzeRequest {
            text: self.text,
            attachment_ids: self.attachment_ids,
            category,
            chat_id: self.chat_id,
        })
    }
}

/// POST /api/v1/analyses
pub async fn create_analysis(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<AnalyzeBody>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), AppError> {
    let meta = RequestMeta::start();
    let request = body.into_request()?;

    let outcome = state.analysis_service.analyze(&auth.user, request).await?;
    let chat_id = outcome.chat.id;

    let data = serde_json::json!({
        "chat": outcome.chat,
        "user_message": outcome.user_message,
        "assistant_message": outcome.assistant_message,
        "max_severity": outcome.analysis.max_severity(),
        "analysis": outcome.analysis,
        "classification": outcome.classification,
        "usage": outcome.usage,
    });

    let resp = meta
        .respond(data)
        .with_link("chat", format!("/api/v1/chats/{chat_id}"))
        .with_link("messages", format!("/api/v1/chats/{chat_id}/messages"))
        .with_link("usage", "/api/v1/usage");
    Ok((StatusCode::CREATED, Json(resp)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_spellings() {
        let body = AnalyzeBody {
            category: Some("Job Posting".to_string()),
            ..AnalyzeBody::default()
        };
        let request = body.into_request().unwrap();
        assert_eq!(request.category, Some(ContentCategory::JobPosting));

        let blank = AnalyzeBody {
            category: Some("  ".to_string()),
            ..AnalyzeBody::default()
        };
        assert_eq!(blank.into_request().unwrap().category, None);
    }

    #[test]
    fn test_unknown_category_is_validation_error() {
        let body = AnalyzeBody {
            text: Some("hello".to_string()),
            category: Some("recipe".to_string()),
            ..AnalyzeBody::default()
        };
        assert!(matches!(body.into_request(), Err(AppError::Validation(_))));
    }
}
