//! End-to-end red-flag analysis.
//!
//! Validates the submission, enforces usage limits, loads attachments,
//! resolves the content category, calls the model with retries, parses the
//! reply and stores both turns in the user's chat history. Only analyses
//! that produce a parsed result are counted against the user's limits.

use std::collections::HashSet;

use chrono::Utc;
use futures_util::future::try_join_all;
use tracing::Instrument;
use uuid::Uuid;

use redflag_types::analysis::{AnalysisResult, Classification, ContentCategory};
use redflag_types::chat::{AttachmentRef, Chat, ChatMessage, MessageRole, Visibility, derive_title};
use redflag_types::config::{LlmConfig, UploadConfig};
use redflag_types::error::{AnalysisError, UploadError};
use redflag_types::llm::{ContentPart, GenerateRequest};
use redflag_types::upload::UploadedFile;
use redflag_types::usage::UsageSnapshot;
use redflag_types::user::User;

use crate::analysis::classifier::resolve_category;
use crate::analysis::parser::parse_analysis;
use crate::analysis::prompt::{system_prompt, user_prompt};
use crate::analysis::retry::{RetryPolicy, retry_with_backoff};
use crate::llm::BoxLlmProvider;
use crate::repository::chat::ChatRepository;
use crate::repository::upload::UploadRepository;
use crate::repository::usage::UsageRepository;
use crate::service::upload::UploadService;
use crate::storage::FileStore;
use crate::usage::service::UsageService;

pub const MAX_TEXT_CHARS: usize = 20_000;

/// A submission to analyze.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    pub text: Option<String>,
    pub attachment_ids: Vec<Uuid>,
    /// Category chosen by the user; skips the classifier when set.
    pub category: Option<ContentCategory>,
    /// Continue an existing chat instead of starting a new one.
    pub chat_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub chat: Chat,
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
    pub analysis: AnalysisResult,
    pub classification: Classification,
    pub usage: UsageSnapshot,
}

/// Request shaping knobs.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub max_text_chars: usize,
    pub max_attachments: usize,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default(), &UploadConfig::default())
    }
}

impl AnalysisOptions {
    pub fn from_config(llm: &LlmConfig, uploads: &UploadConfig) -> Self {
        Self {
            max_text_chars: MAX_TEXT_CHARS,
            max_attachments: uploads.max_attachments,
            max_output_tokens: llm.max_output_tokens,
            temperature: llm.temperature,
        }
    }
}

struct LoadedAttachment {
    file: UploadedFile,
    bytes: Vec<u8>,
}

pub struct AnalysisService<U, F, S, C>
where
    U: UsageRepository,
    F: UploadRepository,
    S: FileStore,
    C: ChatRepository,
{
    provider: BoxLlmProvider,
    usage: UsageService<U>,
    uploads: UploadService<F, S>,
    chats: C,
    retry: RetryPolicy,
    options: AnalysisOptions,
}

impl<U, F, S, C> AnalysisService<U, F, S, C>
where
    U: UsageRepository,
    F: UploadRepository,
    S: FileStore,
    C: ChatRepository,
{
    pub fn new(
        provider: BoxLlmProvider,
        usage: UsageService<U>,
        uploads: UploadService<F, S>,
        chats: C,
        retry: RetryPolicy,
        options: AnalysisOptions,
    ) -> Self {
        Self {
            provider,
            usage,
            uploads,
            chats,
            retry,
            options,
        }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub async fn analyze(
        &self,
        user: &User,
        request: AnalyzeRequest,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let text = request.text.as_deref().unwrap_or("").trim().to_string();
        let attachment_ids = dedup(&request.attachment_ids);
        self.validate(&text, attachment_ids.len())?;

        let allowed = self.usage.ensure_allowed(user).await?;

        let existing_chat = match request.chat_id {
            Some(chat_id) => Some(self.owned_chat(user, &chat_id).await?),
            None => None,
        };

        let attachments = try_join_all(attachment_ids.iter().map(|id| self.load_attachment(user, id))).await?;

        let classification = resolve_category(request.category, &classifier_input(&text, &attachments));
        let category = classification.category;
        tracing::debug!(
            user_id = %user.id,
            category = category.as_str(),
            confidence = classification.confidence,
            attachments = attachments.len(),
            "analysis requested"
        );

        let generate = GenerateRequest {
            system: Some(system_prompt(category)),
            parts: build_parts(&text, &attachments),
            max_output_tokens: self.options.max_output_tokens,
            temperature: Some(self.options.temperature),
            json_output: true,
        };

        let model = self.provider.model().to_string();
        let span = tracing::info_span!(
            "gen_ai.generate",
            otel.name = %format!("generate {model}"),
            gen_ai.operation.name = "generate_content",
            gen_ai.provider.name = self.provider.name(),
            gen_ai.request.model = %model,
            gen_ai.request.max_tokens = generate.max_output_tokens,
            gen_ai.request.temperature = ?generate.temperature,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
        );
        let response = retry_with_backoff(&self.retry, "generate", |_attempt| {
            self.provider.generate(&generate)
        })
        .instrument(span.clone())
        .await?;
        span.record("gen_ai.usage.input_tokens", response.usage.input_tokens);
        span.record("gen_ai.usage.output_tokens", response.usage.output_tokens);
        span.record(
            "gen_ai.response.finish_reasons",
            tracing::field::display(&response.finish_reason),
        );

        let mut analysis = parse_analysis(&response.text, category).map_err(|e| {
            tracing::warn!(
                user_id = %user.id,
                finish_reason = %response.finish_reason,
                output_chars = response.text.len(),
                error = %e,
                "could not parse model output"
            );
            AnalysisError::Parse(e)
        })?;
        if let Some(chosen) = request.category {
            analysis.category = chosen;
        }

        let chat = match existing_chat {
            Some(chat) => chat,
            None => self.start_chat(user, &text, analysis.category).await?,
        };
        let (user_message, assistant_message) = self.save_turn(&chat, &text, &attachments, &analysis).await?;

        let usage = match self.usage.record(user, Some(analysis.category.as_str())).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "failed to record usage");
                allowed
            }
        };

        tracing::info!(
            user_id = %user.id,
            chat_id = %chat.id,
            category = analysis.category.as_str(),
            risk_score = analysis.risk_score,
            red_flags = analysis.red_flags.len(),
            "analysis completed"
        );

        Ok(AnalysisOutcome {
            chat,
            user_message,
            assistant_message,
            analysis,
            classification,
            usage,
        })
    }

    fn validate(&self, text: &str, attachment_count: usize) -> Result<(), AnalysisError> {
        if text.is_empty() && attachment_count == 0 {
            return Err(AnalysisError::EmptySubmission);
        }
        if text.chars().count() > self.options.max_text_chars {
            return Err(AnalysisError::Validation(format!(
                "text exceeds {} characters",
                self.options.max_text_chars
            )));
        }
        if attachment_count > self.options.max_attachments {
            return Err(AnalysisError::Validation(format!(
                "at most {} attachments are allowed",
                self.options.max_attachments
            )));
        }
        Ok(())
    }

    async fn owned_chat(&self, user: &User, chat_id: &Uuid) -> Result<Chat, AnalysisError> {
        let chat = self
            .chats
            .get_chat(chat_id)
            .await
            .map_err(|e| AnalysisError::StorageError(e.to_string()))?
            .ok_or(AnalysisError::NotFound)?;
        if chat.user_id != user.id {
            return Err(AnalysisError::Forbidden);
        }
        Ok(chat)
    }

    async fn load_attachment(&self, user: &User, id: &Uuid) -> Result<LoadedAttachment, AnalysisError> {
        let (file, bytes) = self.uploads.read(user, id).await.map_err(|e| match e {
            UploadError::NotFound => AnalysisError::NotFound,
            other => AnalysisError::StorageError(other.to_string()),
        })?;
        Ok(LoadedAttachment { file, bytes })
    }

    async fn start_chat(
        &self,
        user: &User,
        text: &str,
        category: ContentCategory,
    ) -> Result<Chat, AnalysisError> {
        let chat = Chat {
            id: Uuid::now_v7(),
            user_id: user.id,
            title: derive_title(text, category.label()),
            visibility: Visibility::Private,
            created_at: Utc::now(),
        };
        self.chats
            .create_chat(&chat)
            .await
            .map_err(|e| AnalysisError::StorageError(e.to_string()))
    }

    async fn save_turn(
        &self,
        chat: &Chat,
        text: &str,
        attachments: &[LoadedAttachment],
        analysis: &AnalysisResult,
    ) -> Result<(ChatMessage, ChatMessage), AnalysisError> {
        let user_message = ChatMessage {
            id: Uuid::now_v7(),
            chat_id: chat.id,
            role: MessageRole::User,
            content: text.to_string(),
            attachments: attachments
                .iter()
                .map(|a| AttachmentRef {
                    file_id: a.file.id,
                    filename: a.file.filename.clone(),
                    content_type: a.file.content_type.clone(),
                })
                .collect(),
            analysis: None,
            created_at: Utc::now(),
        };
        let assistant_message = ChatMessage {
            id: Uuid::now_v7(),
            chat_id: chat.id,
            role: MessageRole::Assistant,
            content: analysis.summary.clone(),
            attachments: Vec::new(),
            analysis: Some(analysis.clone()),
            created_at: Utc::now(),
        };

        for message in [&user_message, &assistant_message] {
            self.chats
                .save_message(message)
                .await
                .map_err(|e| AnalysisError::StorageError(e.to_string()))?;
        }
        Ok((user_message, assistant_message))
    }
}

fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Submitted text plus the contents of any plain-text attachments.
fn classifier_input(text: &str, attachments: &[LoadedAttachment]) -> String {
    let mut input = text.to_string();
    for attachment in attachments.iter().filter(|a| !is_inline(&a.file)) {
        input.push('\n');
        input.push_str(&String::from_utf8_lossy(&attachment.bytes));
    }
    input
}

/// Images and PDFs go to the model as binary parts; text files are inlined.
fn is_inline(file: &UploadedFile) -> bool {
    file.is_image() || file.content_type == "application/pdf"
}

fn build_parts(text: &str, attachments: &[LoadedAttachment]) -> Vec<ContentPart> {
    let names: Vec<String> = attachments.iter().map(|a| a.file.filename.clone()).collect();
    let mut parts = vec![ContentPart::text(user_prompt(text, &names))];

    for attachment in attachments {
        if is_inline(&attachment.file) {
            parts.push(ContentPart::InlineData {
                mime_type: attachment.file.content_type.clone(),
                data: attachment.bytes.clone(),
            });
        } else {
            parts.push(ContentPart::text(format!(
                "Contents of {}:\n<<<\n{}\n>>>",
                attachment.file.filename,
                String::from_utf8_lossy(&attachment.bytes).trim()
            )));
        }
    }
    parts
}
