//! UserRepository trait: users, login sessions and one-time email tokens.

use chrono::{DateTime, Utc};
use redflag_types::error::RepositoryError;
use redflag_types::user::{AuthSession, EmailToken, User, UserId};
use uuid::Uuid;

pub trait UserRepository: Send + Sync {
    /// Insert a user. Returns `Conflict` when the email is already taken.
    fn create_user(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;

    fn get_user(
        &self,
        id: &UserId,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Look up by normalized (lowercase) email.
    fn get_user_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    fn update_password(
        &self,
        id: &UserId,
        password_hash: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn mark_email_verified(
        &self,
        id: &UserId,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn create_session(
        &self,
        session: &AuthSession,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<AuthSession>, RepositoryError>> + Send;

    /// Best-effort last-used timestamp update.
    fn touch_session(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn delete_session(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Revoke every session of a user (after a password reset).
    fn delete_sessions_for_user(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    fn create_email_token(
        &self,
        token: &EmailToken,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_email_token(
        &self,
        token_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<EmailToken>, RepositoryError>> + Send;

    fn consume_email_token(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
