//! SQLite user repository: users, auth sessions and email tokens.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use redflag_core::repository::user::UserRepository;
use redflag_types::error::RepositoryError;
use redflag_types::user::{AuthSession, EmailToken, EmailTokenPurpose, User, UserId, UserType};

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

/// SQLite-backed implementation of `UserRepository`.
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct UserRow {
    id: String,
    email: String,
    password_hash: Option<String>,
    user_type: String,
    email_verified_at: Option<String>,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            user_type: row.try_get("user_type")?,
            email_verified_at: row.try_get("email_verified_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_user(self) -> Result<User, RepositoryError> {
        let user_type: UserType = self
            .user_type
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(User {
            id: UserId(parse_uuid(&self.id, "user id")?),
            email: self.email,
            password_hash: self.password_hash,
            user_type,
            email_verified_at: self
                .email_verified_at
                .as_deref()
                .map(parse_datetime)
                .transpose()?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct SessionRow {
    id: String,
    user_id: String,
    token_hash: String,
    created_at: String,
    expires_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            token_hash: row.try_get("token_hash")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }

    fn into_session(self) -> Result<AuthSession, RepositoryError> {
        Ok(AuthSession {
            id: parse_uuid(&self.id, "session id")?,
            user_id: UserId(parse_uuid(&self.user_id, "user_id")?),
            token_hash: self.token_hash,
            created_at: parse_datetime(&self.created_at)?,
            expires_at: parse_datetime(&self.expires_at)?,
        })
    }
}

struct EmailTokenRow {
    id: String,
    user_id: String,
    purpose: String,
    token_hash: String,
    created_at: String,
    expires_at: String,
    consumed_at: Option<String>,
}

impl EmailTokenRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            purpose: row.try_get("purpose")?,
            token_hash: row.try_get("token_hash")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
            consumed_at: row.try_get("consumed_at")?,
        })
    }

    fn into_token(self) -> Result<EmailToken, RepositoryError> {
        let purpose: EmailTokenPurpose = self
            .purpose
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(EmailToken {
            id: parse_uuid(&self.id, "token id")?,
            user_id: UserId(parse_uuid(&self.user_id, "user_id")?),
            purpose,
            token_hash: self.token_hash,
            created_at: parse_datetime(&self.created_at)?,
            expires_at: parse_datetime(&self.expires_at)?,
            consumed_at: self.consumed_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

// ---------------------------------------------------------------------------
// UserRepository implementation
// ---------------------------------------------------------------------------

impl UserRepository for SqliteUserRepository {
    async fn create_user(&self, user: &User) -> Result<User, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO users (id, email, password_hash, user_type, email_verified_at, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.user_type.to_string())
        .bind(user.email_verified_at.as_ref().map(format_datetime))
        .bind(format_datetime(&user.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::Conflict(format!("email '{}' already registered", user.email))
            } else {
                query_error(e)
            }
        })?;

        Ok(user.clone())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|row| UserRow::from_row(&row).map_err(query_error)?.into_user())
            .transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|row| UserRow::from_row(&row).map_err(query_error)?.into_user())
            .transpose()
    }

    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn mark_email_verified(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET email_verified_at = COALESCE(email_verified_at, ?) WHERE id = ?",
        )
        .bind(format_datetime(&at))
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn create_session(&self, session: &AuthSession) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO auth_sessions (id, user_id, token_hash, created_at, expires_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(&session.token_hash)
        .bind(format_datetime(&session.created_at))
        .bind(format_datetime(&session.expires_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn get_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<AuthSession>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM auth_sessions WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|row| SessionRow::from_row(&row).map_err(query_error)?.into_session())
            .transpose()
    }

    async fn touch_session(&self, id: &Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE auth_sessions SET last_used_at = ? WHERE id = ?")
            .bind(format_datetime(&at))
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn delete_session(&self, id: &Uuid) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn delete_sessions_for_user(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_error)?;
        Ok(result.rows_affected())
    }

    async fn create_email_token(&self, token: &EmailToken) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO email_tokens (id, user_id, purpose, token_hash, created_at, expires_at, consumed_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(token.id.to_string())
        .bind(token.user_id.to_string())
        .bind(token.purpose.to_string())
        .bind(&token.token_hash)
        .bind(format_datetime(&token.created_at))
        .bind(format_datetime(&token.expires_at))
        .bind(token.consumed_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn get_email_token(&self, token_hash: &str) -> Result<Option<EmailToken>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM email_tokens WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_error)?;

        row.map(|row| EmailTokenRow::from_row(&row).map_err(query_error)?.into_token())
            .transpose()
    }

    async fn consume_email_token(&self, id: &Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        // Only the first consumer wins.
        let result = sqlx::query(
            "UPDATE email_tokens SET consumed_at = ? WHERE id = ? AND consumed_at IS NULL",
        )
        .bind(format_datetime(&at))
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
