//! SQLite chat repository: chats, messages and votes.
//!
//! Message attachments and analyses are stored as JSON text columns.

use sqlx::Row;
use uuid::Uuid;

use redflag_core::repository::chat::ChatRepository;
use redflag_types::analysis::AnalysisResult;
use redflag_types::chat::{AttachmentRef, Chat, ChatMessage, MessageRole, Visibility, Vote};
use redflag_types::error::RepositoryError;
use redflag_types::user::UserId;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

/// SQLite-backed implementation of `ChatRepository`.
#[derive(Clone)]
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatRow {
    id: String,
    user_id: String,
    title: String,
    visibility: String,
    created_at: String,
}

impl ChatRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            visibility: row.try_get("visibility")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_chat(self) -> Result<Chat, RepositoryError> {
        let visibility: Visibility = self
            .visibility
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Chat {
            id: parse_uuid(&self.id, "chat id")?,
            user_id: UserId(parse_uuid(&self.user_id, "user_id")?),
            title: self.title,
            visibility,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct MessageRow {
    id: String,
    chat_id: String,
    role: String,
    content: String,
    attachments: String,
    analysis: Option<String>,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            attachments: row.try_get("attachments")?,
            analysis: row.try_get("analysis")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let attachments: Vec<AttachmentRef> = serde_json::from_str(&self.attachments)
            .map_err(|e| RepositoryError::Query(format!("invalid attachments json: {e}")))?;
        let analysis: Option<AnalysisResult> = self
            .analysis
            .as_deref()
            .map(serde_json::from_str::<AnalysisResult>)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid analysis json: {e}")))?;

        Ok(ChatMessage {
            id: parse_uuid(&self.id, "message id")?,
            chat_id: parse_uuid(&self.chat_id, "chat_id")?,
            role,
            content: self.content,
            attachments,
            analysis,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Query(format!("json encode: {e}")))
}

// ---------------------------------------------------------------------------
// ChatRepository implementation
// ---------------------------------------------------------------------------

impl ChatRepository for SqliteChatRepository {
    async fn create_chat(&self, chat: &Chat) -> Result<Chat, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO chats (id, user_id, title, visibility, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(chat.id.to_string())
        .bind(chat.user_id.to_string())
        .bind(&chat.title)
        .bind(chat.visibility.to_string())
        .bind(format_datetime(&chat.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(chat.clone())
    }

    async fn get_chat(&self, id: &Uuid) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chats WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|row| ChatRow::from_row(&row).map_err(query_error)?.into_chat())
            .transpose()
    }

    async fn list_chats(
        &self,
        user_id: &UserId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Chat>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM chats WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id.to_string())
        .bind(limit.unwrap_or(-1))
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in &rows {
            chats.push(ChatRow::from_row(row).map_err(query_error)?.into_chat()?);
        }
        Ok(chats)
    }

    async fn update_visibility(&self, id: &Uuid, visibility: Visibility) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE chats SET visibility = ? WHERE id = ?")
            .bind(visibility.to_string())
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_chat(&self, id: &Uuid) -> Result<(), RepositoryError> {
        // Messages and votes go with the chat via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn save_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        let analysis = message.analysis.as_ref().map(to_json).transpose()?;
        sqlx::query(
            r#"INSERT INTO messages (id, chat_id, role, content, attachments, analysis, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.chat_id.to_string())
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(to_json(&message.attachments)?)
        .bind(analysis)
        .bind(format_datetime(&message.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn get_message(&self, id: &Uuid) -> Result<Option<ChatMessage>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|row| MessageRow::from_row(&row).map_err(query_error)?.into_message())
            .transpose()
    }

    async fn get_messages(&self, chat_id: &Uuid) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM messages WHERE chat_id = ? ORDER BY created_at ASC, id ASC")
            .bind(chat_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            messages.push(MessageRow::from_row(row).map_err(query_error)?.into_message()?);
        }
        Ok(messages)
    }

    async fn upsert_vote(&self, vote: &Vote) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO votes (chat_id, message_id, is_upvoted) VALUES (?, ?, ?)
               ON CONFLICT (chat_id, message_id) DO UPDATE SET is_upvoted = excluded.is_upvoted"#,
        )
        .bind(vote.chat_id.to_string())
        .bind(vote.message_id.to_string())
        .bind(vote.is_upvoted)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn get_votes(&self, chat_id: &Uuid) -> Result<Vec<Vote>, RepositoryError> {
        let rows = sqlx::query("SELECT chat_id, message_id, is_upvoted FROM votes WHERE chat_id = ?")
            .bind(chat_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_error)?;

        let mut votes = Vec::with_capacity(rows.len());
        for row in &rows {
            let chat_id: String = row.try_get("chat_id").map_err(query_error)?;
            let message_id: String = row.try_get("message_id").map_err(query_error)?;
            let is_upvoted: bool = row.try_get("is_upvoted").map_err(query_error)?;
            votes.push(Vote {
                chat_id: parse_uuid(&chat_id, "chat_id")?,
                message_id: parse_uuid(&message_id, "message_id")?,
                is_upvoted,
            });
        }
        Ok(votes)
    }
}
