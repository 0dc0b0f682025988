//! Chat history handlers: listing, visibility, deletion and votes.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use redflag_types::chat::{Chat, ChatMessage, Visibility, Vote};
use redflag_types::error::ChatError;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::extractors::query::PageQuery;
use crate::http::response::{ApiResponse, RequestMeta};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VisibilityBody {
    pub visibility: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Up,
    Down,
}

#[derive(Debug, Deserialize)]
pub struct VoteBody {
    #[serde(rename = "type")]
    pub kind: VoteKind,
}

fn parse_id(raw: &str, not_found: ChatError) -> Result<Uuid, AppError> {
    raw.parse().map_err(|_| AppError::Chat(not_found))
}

fn chat_links<T: serde::Serialize>(resp: ApiResponse<T>, id: &Uuid) -> ApiResponse<T> {
    resp.with_link("self", format!("/api/v1/chats/{id}"))
        .with_link("messages", format!("/api/v1/chats/{id}/messages"))
        .with_link("votes", format!("/api/v1/chats/{id}/votes"))
}

/// GET /api/v1/chats
pub async fn list_chats(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<Chat>>>, AppError> {
    let meta = RequestMeta::start();
    let chats = state
        .chat_service
        .list_chats(&auth.user, query.limit, query.offset)
        .await?;
    Ok(Json(meta.respond(chats).with_link("self", "/api/v1/chats")))
}

/// GET /api/v1/chats/{id}
pub async fn get_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Chat>>, AppError> {
    let meta = RequestMeta::start();
    let id = parse_id(&id, ChatError::NotFound)?;
    let chat = state.chat_service.get_chat(&auth.user, &id).await?;
    Ok(Json(chat_links(meta.respond(chat), &id)))
}

/// DELETE /api/v1/chats/{id}
pub async fn delete_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let meta = RequestMeta::start();
    let id = parse_id(&id, ChatError::NotFound)?;
    state.chat_service.delete_chat(&auth.user, &id).await?;
    Ok(Json(meta.respond(serde_json::json!({ "deleted": true, "id": id }))))
}

/// PUT /api/v1/chats/{id}/visibility
pub async fn set_visibility(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<VisibilityBody>,
) -> Result<Json<ApiResponse<Chat>>, AppError> {
    let meta = RequestMeta::start();
    let id = parse_id(&id, ChatError::NotFound)?;
    let visibility: Visibility = body.visibility.parse().map_err(AppError::Validation)?;
    let chat = state
        .chat_service
        .set_visibility(&auth.user, &id, visibility)
        .await?;
    Ok(Json(chat_links(meta.respond(chat), &id)))
}

/// GET /api/v1/chats/{id}/messages - oldest first.
pub async fn get_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ChatMessage>>>, AppError> {
    let meta = RequestMeta::start();
    let id = parse_id(&id, ChatError::NotFound)?;
    let messages = state.chat_service.messages(&auth.user, &id).await?;
    Ok(Json(
        meta.respond(messages)
            .with_link("chat", format!("/api/v1/chats/{id}")),
    ))
}

/// GET /api/v1/chats/{id}/votes
pub async fn get_votes(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Vote>>>, AppError> {
    let meta = RequestMeta::start();
    let id = parse_id(&id, ChatError::NotFound)?;
    let votes = state.chat_service.votes(&auth.user, &id).await?;
    Ok(Json(
        meta.respond(votes)
            .with_link("chat", format!("/api/v1/chats/{id}")),
    ))
}

/// PUT /api/v1/chats/{id}/messages/{message_id}/vote
pub async fn vote_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, message_id)): Path<(String, String)>,
    Json(body): Json<VoteBody>,
) -> Result<Json<ApiResponse<Vote>>, AppError> {
    let meta = RequestMeta::start();
    let id = parse_id(&id, ChatError::NotFound)?;
    let message_id = parse_id(&message_id, ChatError::MessageNotFound)?;
    let vote = state
        .chat_service
        .vote(&auth.user, &id, &message_id, body.kind == VoteKind::Up)
        .await?;
    Ok(Json(
        meta.respond(vote)
            .with_link("votes", format!("/api/v1/chats/{id}/votes")),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_body() {
        let up: VoteBody = serde_json::from_str(r#"{"type": "up"}"#).unwrap();
        assert_eq!(up.kind, VoteKind::Up);
        let down: VoteBody = serde_json::from_str(r#"{"type": "down"}"#).unwrap();
        assert_eq!(down.kind, VoteKind::Down);
        assert!(serde_json::from_str::<VoteBody>(r#"{"type": "sideways"}"#).is_err());
    }
}
