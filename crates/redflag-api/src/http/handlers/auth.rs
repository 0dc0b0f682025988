//! Account and session handlers.

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use redflag_core::service::auth::SessionGrant;
use redflag_types::user::User;

use crate::http::error::AppError;
use crate::http::extractors::auth::{AuthUser, clear_session_cookie, session_cookie};
use crate::http::response::{ApiResponse, RequestMeta};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CredentialsBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenBody {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailBody {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetConfirmBody {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub user: User,
    pub token: String,
    pub expires_at: String,
}

/// 201/200 with the session envelope and a `Set-Cookie` header.
fn session_response(status: StatusCode, grant: SessionGrant, meta: RequestMeta) -> impl IntoResponse {
    let max_age = (grant.expires_at - Utc::now()).num_seconds().max(0);
    let cookie = session_cookie(&grant.token, max_age);
    let body = meta
        .respond(SessionView {
            user: grant.user,
            token: grant.token,
            expires_at: grant.expires_at.to_rfc3339(),
        })
        .with_link("me", "/api/v1/auth/me")
        .with_link("usage", "/api/v1/usage");

    (status, AppendHeaders([(header::SET_COOKIE, cookie)]), Json(body))
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> Result<impl IntoResponse, AppError> {
    let meta = RequestMeta::start();
    let grant = state.auth_service.register(&body.email, &body.password).await?;
    Ok(session_response(StatusCode::CREATED, grant, meta))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> Result<impl IntoResponse, AppError> {
    let meta = RequestMeta::start();
    let grant = state.auth_service.login(&body.email, &body.password).await?;
    Ok(session_response(StatusCode::OK, grant, meta))
}

/// POST /api/v1/auth/guest
pub async fn guest(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let meta = RequestMeta::start();
    let grant = state.auth_service.guest().await?;
    Ok(session_response(StatusCode::CREATED, grant, meta))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let meta = RequestMeta::start();
    state.auth_service.logout(&auth.token).await?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]),
        Json(meta.respond(serde_json::json!({ "logged_out": true }))),
    ))
}

/// GET /api/v1/auth/me
pub async fn me(auth: AuthUser) -> Json<ApiResponse<User>> {
    Json(
        RequestMeta::start()
            .respond(auth.user)
            .with_link("self", "/api/v1/auth/me")
            .with_link("chats", "/api/v1/chats"),
    )
}

/// POST /api/v1/auth/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<TokenBody>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let meta = RequestMeta::start();
    let user = state.auth_service.verify_email(&body.token).await?;
    Ok(Json(meta.respond(user)))
}

/// POST /api/v1/auth/password-reset
///
/// Always 202, whether or not the address has an account.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<EmailBody>,
) -> Result<impl IntoResponse, AppError> {
    let meta = RequestMeta::start();
    state.auth_service.request_password_reset(&body.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(meta.respond(serde_json::json!({
            "message": "If an account exists for this address, a reset link has been sent."
        }))),
    ))
}

/// POST /api/v1/auth/password-reset/confirm
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(body): Json<ResetConfirmBody>,
) -> Result<impl IntoResponse, AppError> {
    let meta = RequestMeta::start();
    state
        .auth_service
        .reset_password(&body.token, &body.password)
        .await?;
    Ok((
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]),
        Json(meta.respond(serde_json::json!({ "password_reset": true }))),
    ))
}
