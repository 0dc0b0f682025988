//! Chat history service: listing, visibility, deletion and message votes.

use uuid::Uuid;

use redflag_types::chat::{Chat, ChatMessage, MessageRole, Visibility, Vote};
use redflag_types::error::{ChatError, RepositoryError};
use redflag_types::user::User;

use crate::repository::chat::ChatRepository;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

pub struct ChatService<R: ChatRepository> {
    repo: R,
}

fn storage(e: RepositoryError) -> ChatError {
    ChatError::StorageError(e.to_string())
}

impl<R: ChatRepository> ChatService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// The user's chats, newest first.
    pub async fn list_chats(
        &self,
        user: &User,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Chat>, ChatError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);
        self.repo
            .list_chats(&user.id, Some(limit), Some(offset))
            .await
            .map_err(storage)
    }

    /// A chat the viewer may read: their own, or anyone's public chat.
    pub async fn get_chat(&self, viewer: &User, chat_id: &Uuid) -> Result<Chat, ChatError> {
        let chat = self.load(chat_id).await?;
        if chat.user_id != viewer.id && chat.visibility == Visibility::Private {
            return Err(ChatError::Forbidden);
        }
        Ok(chat)
    }

    /// Messages of a readable chat, oldest first.
    pub async fn messages(&self, viewer: &User, chat_id: &Uuid) -> Result<Vec<ChatMessage>, ChatError> {
        self.get_chat(viewer, chat_id).await?;
        self.repo.get_messages(chat_id).await.map_err(storage)
    }

    pub async fn set_visibility(
        &self,
        owner: &User,
        chat_id: &Uuid,
        visibility: Visibility,
    ) -> Result<Chat, ChatError> {
        let mut chat = self.owned(owner, chat_id).await?;
        self.repo
            .update_visibility(chat_id, visibility)
            .await
            .map_err(storage)?;
        chat.visibility = visibility;
        tracing::debug!(chat_id = %chat_id, visibility = %visibility, "chat visibility changed");
        Ok(chat)
    }

    pub async fn delete_chat(&self, owner: &User, chat_id: &Uuid) -> Result<(), ChatError> {
        self.owned(owner, chat_id).await?;
        self.repo.delete_chat(chat_id).await.map_err(storage)?;
        tracing::info!(chat_id = %chat_id, "chat deleted");
        Ok(())
    }

    /// Record the owner's up/down vote on an assistant message.
    ///
    /// Voting again replaces the previous vote.
    pub async fn vote(
        &self,
        owner: &User,
        chat_id: &Uuid,
        message_id: &Uuid,
        is_upvoted: bool,
    ) -> Result<Vote, ChatError> {
        self.owned(owner, chat_id).await?;
        let message = self
            .repo
            .get_message(message_id)
            .await
            .map_err(storage)?
            .filter(|m| m.chat_id == *chat_id)
            .ok_or(ChatError::MessageNotFound)?;
        if message.role != MessageRole::Assistant {
            return Err(ChatError::InvalidVoteTarget);
        }

        let vote = Vote {
            chat_id: *chat_id,
            message_id: *message_id,
            is_upvoted,
        };
        self.repo.upsert_vote(&vote).await.map_err(storage)?;
        Ok(vote)
    }

    pub async fn votes(&self, viewer: &User, chat_id: &Uuid) -> Result<Vec<Vote>, ChatError> {
        self.get_chat(viewer, chat_id).await?;
        self.repo.get_votes(chat_id).await.map_err(storage)
    }

    async fn load(&self, chat_id: &Uuid) -> Result<Chat, ChatError> {
        self.repo
            .get_chat(chat_id)
            .await
            .map_err(storage)?
            .ok_or(ChatError::NotFound)
    }

    async fn owned(&self, owner: &User, chat_id: &Uuid) -> Result<Chat, ChatError> {
        let chat = self.load(chat_id).await?;
        if chat.user_id != owner.id {
            return Err(ChatError::Forbidden);
        }
        Ok(chat)
    }
}
