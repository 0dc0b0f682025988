//! Upload and download handlers.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use uuid::Uuid;

use redflag_types::error::UploadError;
use redflag_types::upload::UploadedFile;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::response::{ApiResponse, RequestMeta};
use crate::state::AppState;

const FILE_FIELD: &str = "file";

/// Body-limit failures are 413, everything else is a malformed request.
fn multipart_error(e: MultipartError, max_bytes: usize) -> AppError {
    tracing::debug!(error = %e, status = %e.status(), "multipart read failed");
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Upload(UploadError::TooLarge { max_bytes })
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// POST /api/v1/files - multipart upload, field `file`.
pub async fn upload_file(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadedFile>>), AppError> {
    let meta = RequestMeta::start();

    let max_bytes = state.upload_service.max_bytes();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let declared = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, max_bytes))?;

        let file = state
            .upload_service
            .upload(&auth.user, &filename, declared.as_deref(), &bytes)
            .await?;

        let resp = meta
            .respond(file.clone())
            .with_link("self", format!("/api/v1/files/{}", file.id))
            .with_link("analyze", "/api/v1/analyses");
        return Ok((StatusCode::CREATED, Json(resp)));
    }

    Err(AppError::Validation(format!(
        "Multipart body must contain a '{FILE_FIELD}' field"
    )))
}

/// GET /api/v1/files/{id} - download one of the caller's uploads.
pub async fn download_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id: Uuid = id.parse().map_err(|_| AppError::Upload(UploadError::NotFound))?;
    let (file, bytes) = state.upload_service.read(&auth.user, &id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        bytes,
    ))
}
