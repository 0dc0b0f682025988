//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`, plus an unauthenticated `/health`.
//! Middleware: CORS, request tracing, request body limit.

use axum::Json;
use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Headroom above the upload limit for multipart framing.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.uploads.max_bytes + MULTIPART_OVERHEAD_BYTES;

    let api_routes = Router::new()
        // Accounts and sessions
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/guest", post(handlers::auth::guest))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/verify-email", post(handlers::auth::verify_email))
        .route(
            "/auth/password-reset",
            post(handlers::auth::request_password_reset),
        )
        .route(
            "/auth/password-reset/confirm",
            post(handlers::auth::confirm_password_reset),
        )
        // Uploads
        .route("/files", post(handlers::files::upload_file))
        .route("/files/{id}", get(handlers::files::download_file))
        // Classification and analysis
        .route("/classify", post(handlers::classify::classify_text))
        .route("/analyses", post(handlers::analyses::create_analysis))
        // Chat history
        .route("/chats", get(handlers::chats::list_chats))
        .route(
            "/chats/{id}",
            get(handlers::chats::get_chat).delete(handlers::chats::delete_chat),
        )
        .route(
            "/chats/{id}/visibility",
            put(handlers::chats::set_visibility),
        )
        .route("/chats/{id}/messages", get(handlers::chats::get_messages))
        .route("/chats/{id}/votes", get(handlers::chats::get_votes))
        .route(
            "/chats/{id}/messages/{message_id}/vote",
            put(handlers::chats::vote_message),
        )
        // Usage
        .route("/usage", get(handlers::usage::get_usage));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - liveness plus a database ping (no auth required).
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let database = match state.db_pool.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "health check database ping failed");
            "unavailable"
        }
    };
    let status = if database == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if database == "ok" { "ok" } else { "degraded" },
            "database": database,
            "model": state.analysis_service.model(),
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
