//! In-memory fakes of the repository, storage, mail, credential and LLM
//! seams, shared by the service tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use redflag_types::chat::{Chat, ChatMessage, Visibility, Vote};
use redflag_types::error::{AuthError, MailError, RepositoryError, StorageError};
use redflag_types::llm::{
    FinishReason, GenerateRequest, GenerateResponse, LlmError, Usage,
};
use redflag_types::upload::UploadedFile;
use redflag_types::usage::{UsageCounter, UsageLogEntry};
use redflag_types::user::{AuthSession, EmailToken, User, UserId, UserType};

use crate::email::{Mailer, OutgoingEmail};
use crate::llm::LlmProvider;
use crate::repository::chat::ChatRepository;
use crate::repository::upload::UploadRepository;
use crate::repository::usage::UsageRepository;
use crate::repository::user::UserRepository;
use crate::service::credentials::Credentials;
use crate::storage::FileStore;

pub fn guest_user() -> User {
    User {
        id: UserId::new(),
        email: format!("guest-{}@guest.local", Uuid::now_v7()),
        password_hash: None,
        user_type: UserType::Guest,
        email_verified_at: None,
        created_at: Utc::now(),
    }
}

pub fn regular_user(email: &str) -> User {
    User {
        id: UserId::new(),
        email: email.to_string(),
        password_hash: Some("plain:secret-password".to_string()),
        user_type: UserType::Regular,
        email_verified_at: Some(Utc::now()),
        created_at: Utc::now(),
    }
}

// --- Usage ---

#[derive(Clone, Default)]
pub struct InMemoryUsage {
    counters: Arc<Mutex<HashMap<UserId, UsageCounter>>>,
    logs: Arc<Mutex<Vec<UsageLogEntry>>>,
}

impl InMemoryUsage {
    pub fn log_count(&self) -> usize {
        self.logs.lock().unwrap().len()
    }

    pub fn counter(&self, user_id: &UserId) -> Option<UsageCounter> {
        self.counters.lock().unwrap().get(user_id).cloned()
    }
}

impl UsageRepository for InMemoryUsage {
    async fn get_counter(&self, user_id: &UserId) -> Result<Option<UsageCounter>, RepositoryError> {
        Ok(self.counter(user_id))
    }

    async fn increment_counter(
        &self,
        user_id: &UserId,
        day_key: &str,
        month_key: &str,
    ) -> Result<UsageCounter, RepositoryError> {
        let mut counters = self.counters.lock().unwrap();
        let next = crate::usage::increment(counters.get(user_id), *user_id, day_key, month_key);
        counters.insert(*user_id, next.clone());
        Ok(next)
    }

    async fn append_log(&self, entry: &UsageLogEntry) -> Result<(), RepositoryError> {
        self.logs.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

// --- Users ---

#[derive(Clone, Default)]
pub struct InMemoryUsers {
    users: Arc<Mutex<Vec<User>>>,
    sessions: Arc<Mutex<Vec<AuthSession>>>,
    tokens: Arc<Mutex<Vec<EmailToken>>>,
    stale_token_reads: Arc<AtomicBool>,
}

impl InMemoryUsers {
    /// Make `get_email_token` report tokens as unconsumed, the way a read
    /// racing another request's consume would see them.
    pub fn serve_stale_token_reads(&self) {
        self.stale_token_reads.store(true, Ordering::SeqCst);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn insert_session(&self, session: AuthSession) {
        self.sessions.lock().unwrap().push(session);
    }

    pub fn user(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }
}

impl UserRepository for InMemoryUsers {
    async fn create_user(&self, user: &User) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict(user.email.clone()));
        }
        users.push(user.clone());
        Ok(user.clone())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == *id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.user(email))
    }

    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().unwrap();
        let user = users.iter_mut().find(|u| u.id == *id).ok_or(RepositoryError::NotFound)?;
        user.password_hash = Some(password_hash.to_string());
        Ok(())
    }

    async fn mark_email_verified(&self, id: &UserId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().unwrap();
        let user = users.iter_mut().find(|u| u.id == *id).ok_or(RepositoryError::NotFound)?;
        user.email_verified_at = Some(at);
        Ok(())
    }

    async fn create_session(&self, session: &AuthSession) -> Result<(), RepositoryError> {
        self.insert_session(session.clone());
        Ok(())
    }

    async fn get_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<AuthSession>, RepositoryError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.token_hash == token_hash)
            .cloned())
    }

    async fn touch_session(&self, _id: &Uuid, _at: DateTime<Utc>) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn delete_session(&self, id: &Uuid) -> Result<(), RepositoryError> {
        self.sessions.lock().unwrap().retain(|s| s.id != *id);
        Ok(())
    }

    async fn delete_sessions_for_user(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.user_id != *user_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn create_email_token(&self, token: &EmailToken) -> Result<(), RepositoryError> {
        self.tokens.lock().unwrap().push(token.clone());
        Ok(())
    }

    async fn get_email_token(&self, token_hash: &str) -> Result<Option<EmailToken>, RepositoryError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.token_hash == token_hash)
            .cloned()
            .map(|mut t| {
                if self.stale_token_reads.load(Ordering::SeqCst) {
                    t.consumed_at = None;
                }
                t
            }))
    }

    async fn consume_email_token(&self, id: &Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut tokens = self.tokens.lock().unwrap();
        let token = tokens
            .iter_mut()
            .find(|t| t.id == *id && t.consumed_at.is_none())
            .ok_or(RepositoryError::NotFound)?;
        token.consumed_at = Some(at);
        Ok(())
    }
}

// --- Chats ---

#[derive(Clone, Default)]
pub struct InMemoryChats {
    chats: Arc<Mutex<Vec<Chat>>>,
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    votes: Arc<Mutex<Vec<Vote>>>,
}

impl InMemoryChats {
    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn chat_count(&self) -> usize {
        self.chats.lock().unwrap().len()
    }
}

impl ChatRepository for InMemoryChats {
    async fn create_chat(&self, chat: &Chat) -> Result<Chat, RepositoryError> {
        self.chats.lock().unwrap().push(chat.clone());
        Ok(chat.clone())
    }

    async fn get_chat(&self, id: &Uuid) -> Result<Option<Chat>, RepositoryError> {
        Ok(self.chats.lock().unwrap().iter().find(|c| c.id == *id).cloned())
    }

    async fn list_chats(
        &self,
        user_id: &UserId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Chat>, RepositoryError> {
        let mut chats: Vec<Chat> = self
            .chats
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == *user_id)
            .cloned()
            .collect();
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let offset = offset.unwrap_or(0).max(0) as usize;
        let limit = limit.unwrap_or(i64::MAX).max(0) as usize;
        Ok(chats.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_visibility(&self, id: &Uuid, visibility: Visibility) -> Result<(), RepositoryError> {
        let mut chats = self.chats.lock().unwrap();
        let chat = chats.iter_mut().find(|c| c.id == *id).ok_or(RepositoryError::NotFound)?;
        chat.visibility = visibility;
        Ok(())
    }

    async fn delete_chat(&self, id: &Uuid) -> Result<(), RepositoryError> {
        self.chats.lock().unwrap().retain(|c| c.id != *id);
        self.messages.lock().unwrap().retain(|m| m.chat_id != *id);
        self.votes.lock().unwrap().retain(|v| v.chat_id != *id);
        Ok(())
    }

    async fn save_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn get_message(&self, id: &Uuid) -> Result<Option<ChatMessage>, RepositoryError> {
        Ok(self.messages.lock().unwrap().iter().find(|m| m.id == *id).cloned())
    }

    async fn get_messages(&self, chat_id: &Uuid) -> Result<Vec<ChatMessage>, RepositoryError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == *chat_id)
            .cloned()
            .collect())
    }

    async fn upsert_vote(&self, vote: &Vote) -> Result<(), RepositoryError> {
        let mut votes = self.votes.lock().unwrap();
        votes.retain(|v| !(v.chat_id == vote.chat_id && v.message_id == vote.message_id));
        votes.push(vote.clone());
        Ok(())
    }

    async fn get_votes(&self, chat_id: &Uuid) -> Result<Vec<Vote>, RepositoryError> {
        Ok(self
            .votes
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.chat_id == *chat_id)
            .cloned()
            .collect())
    }
}

// --- Uploads and blobs ---

#[derive(Clone, Default)]
pub struct InMemoryUploads {
    files: Arc<Mutex<Vec<UploadedFile>>>,
}

impl UploadRepository for InMemoryUploads {
    async fn create_upload(&self, file: &UploadedFile) -> Result<(), RepositoryError> {
        self.files.lock().unwrap().push(file.clone());
        Ok(())
    }

    async fn get_upload(&self, id: &Uuid) -> Result<Option<UploadedFile>, RepositoryError> {
        Ok(self.files.lock().unwrap().iter().find(|f| f.id == *id).cloned())
    }

    async fn list_uploads(&self, user_id: &UserId) -> Result<Vec<UploadedFile>, RepositoryError> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn delete_upload(&self, id: &Uuid) -> Result<(), RepositoryError> {
        self.files.lock().unwrap().retain(|f| f.id != *id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryFileStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryFileStore {
    pub fn keys(&self) -> Vec<String> {
        self.blobs.lock().unwrap().keys().cloned().collect()
    }
}

impl FileStore for MemoryFileStore {
    async fn put(&self, key: &str, data: &[u8], _content_type: &str) -> Result<(), StorageError> {
        self.blobs.lock().unwrap().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}

// --- Mail and credentials ---

#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Pull the `token=` query value out of the last email's text body.
    pub fn last_token(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let text = &sent.last()?.text;
        let start = text.find("token=")? + "token=".len();
        let token: String = text[start..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        Some(token)
    }
}

impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Reversible "hashing" so tests can assert on stored values.
#[derive(Clone, Default)]
pub struct PlainCredentials {
    counter: Arc<Mutex<u64>>,
}

impl Credentials for PlainCredentials {
    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        Ok(format!("plain:{password}"))
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        hash.strip_prefix("plain:") == Some(password)
    }

    fn generate_token(&self) -> String {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        format!("tok{:04}", *counter)
    }

    fn hash_token(&self, token: &str) -> String {
        format!("h-{token}")
    }
}

// --- LLM ---

/// Provider that replays a fixed script of results and records every request.
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            requests: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    fn generate(
        &self,
        request: &GenerateRequest,
    ) -> impl Future<Output = Result<GenerateResponse, LlmError>> + Send {
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse));
        async move {
            next.map(|text| GenerateResponse {
                text,
                model: "scripted-model".to_string(),
                finish_reason: FinishReason::Stop,
                usage: Usage {
                    input_tokens: 120,
                    output_tokens: 80,
                },
            })
        }
    }
}
