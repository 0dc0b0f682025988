//! ChatRepository trait: chats, messages and votes.

use redflag_types::chat::{Chat, ChatMessage, Visibility, Vote};
use redflag_types::error::RepositoryError;
use redflag_types::user::UserId;
use uuid::Uuid;

pub trait ChatRepository: Send + Sync {
    fn create_chat(
        &self,
        chat: &Chat,
    ) -> impl std::future::Future<Output = Result<Chat, RepositoryError>> + Send;

    fn get_chat(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, RepositoryError>> + Send;

    /// List a user's chats, newest first.
    fn list_chats(
        &self,
        user_id: &UserId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<Chat>, RepositoryError>> + Send;

    fn update_visibility(
        &self,
        id: &Uuid,
        visibility: Visibility,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a chat with its messages and votes.
    fn delete_chat(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn save_message(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_message(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatMessage>, RepositoryError>> + Send;

    /// Messages of a chat, oldest first.
    fn get_messages(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Insert or replace the vote on a message.
    fn upsert_vote(
        &self,
        vote: &Vote,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_votes(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Vote>, RepositoryError>> + Send;
}
