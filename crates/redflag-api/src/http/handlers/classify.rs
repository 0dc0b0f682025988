//! Keyword classification without an LLM call.

use axum::Json;
use serde::Deserialize;

use redflag_core::analysis::classifier::classify;
use redflag_core::service::analysis::MAX_TEXT_CHARS;
use redflag_types::analysis::Classification;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::response::{ApiResponse, RequestMeta};

#[derive(Debug, Deserialize)]
pub struct ClassifyBody {
    pub text: String,
}

/// POST /api/v1/classify
pub async fn classify_text(
    _auth: AuthUser,
    Json(body): Json<ClassifyBody>,
) -> Result<Json<ApiResponse<Classification>>, AppError> {
    let meta = RequestMeta::start();

    let text = body.text.trim();
    if text.is_empty() {
        return Err(AppError::Validation("text must not be empty".to_string()));
    }
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(AppError::Validation(format!(
            "text exceeds {MAX_TEXT_CHARS} characters"
        )));
    }

    Ok(Json(meta.respond(classify(text)).with_link("analyze", "/api/v1/analyses")))
}
