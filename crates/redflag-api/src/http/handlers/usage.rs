//! Usage counter handler.

use axum::Json;
use axum::extract::State;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::response::{ApiResponse, RequestMeta};
use crate::state::AppState;

/// GET /api/v1/usage
pub async fn get_usage(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let meta = RequestMeta::start();
    let snapshot = state.usage_service.snapshot(&auth.user).await?;

    let mut data = serde_json::to_value(&snapshot)
        .map_err(|e| AppError::Internal(format!("failed to serialize usage: {e}")))?;
    data["user_type"] = serde_json::json!(auth.user.user_type);
    data["remaining_today"] = serde_json::json!(snapshot.remaining_today());

    Ok(Json(meta.respond(data).with_link("self", "/api/v1/usage")))
}
