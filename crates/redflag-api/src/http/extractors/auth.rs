//! Session authentication extractor.
//!
//! Reads the session token from:
//! - `Authorization: Bearer <token>` header
//! - `redflag_session` cookie
//!
//! The token is resolved to a [`User`] through `AuthService::authenticate`,
//! which compares SHA-256 digests against the `auth_sessions` table.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use redflag_types::user::User;

use crate::http::error::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "redflag_session";

/// The authenticated caller. Extracting this validates the session.
pub struct AuthUser {
    pub user: User,
    /// The presented token, kept so logout can revoke exactly this session.
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(parts)?;
        let user = state.auth_service.authenticate(&token).await?;
        Ok(AuthUser { user, token })
    }
}

/// Extract the session token from request headers.
fn extract_session_token(parts: &Parts) -> Result<String, AppError> {
    if let Some(auth) = parts.headers.get(header::AUTHORIZATION) {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Ok(token.to_string());
            }
        }
    }

    for value in parts.headers.get_all(header::COOKIE) {
        if let Some(token) = value.to_str().ok().and_then(session_from_cookie_header) {
            return Ok(token);
        }
    }

    Err(AppError::Unauthorized(
        "Missing session. Provide 'Authorization: Bearer <token>' or the redflag_session cookie."
            .to_string(),
    ))
}

fn session_from_cookie_header(header: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

/// `Set-Cookie` value carrying a new session token.
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

/// `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
