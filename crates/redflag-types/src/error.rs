use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in redflag-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from the blob store holding uploaded bytes.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("io error: {0}")]
    Io(String),
}

/// Errors from outbound email delivery.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("email provider rejected the message: {0}")]
    Rejected(String),

    #[error("email transport error: {0}")]
    Transport(String),
}

/// Errors related to registration, login and sessions.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("password must be between {min} and {max} characters")]
    WeakPassword { min: usize, max: usize },

    #[error("session is missing, invalid, or expired")]
    InvalidSession,

    #[error("token is invalid or expired")]
    InvalidToken,

    #[error("password hashing failed")]
    Hashing,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("email delivery failed: {0}")]
    Mail(#[from] MailError),
}

/// Errors related to file uploads.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file is empty")]
    Empty,

    #[error("file exceeds the {max_bytes} byte limit")]
    TooLarge { max_bytes: usize },

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("declared type '{declared}' does not match file content '{detected}'")]
    TypeMismatch { declared: String, detected: String },

    #[error("file not found")]
    NotFound,

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Rate-limit rejections from the usage counters.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("daily limit of {limit} analyses reached")]
    DailyLimitReached { limit: u32, resets_at: DateTime<Utc> },

    #[error("monthly limit of {limit} analyses reached")]
    MonthlyLimitReached { limit: u32, resets_at: DateTime<Utc> },

    #[error("storage error: {0}")]
    StorageError(String),
}

impl UsageError {
    pub fn resets_at(&self) -> Option<DateTime<Utc>> {
        match self {
            UsageError::DailyLimitReached { resets_at, .. }
            | UsageError::MonthlyLimitReached { resets_at, .. } => Some(*resets_at),
            UsageError::StorageError(_) => None,
        }
    }
}

/// Errors related to chat history access.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat not found")]
    NotFound,

    #[error("message not found")]
    MessageNotFound,

    #[error("you do not have access to this chat")]
    Forbidden,

    #[error("only assistant messages can be voted on")]
    InvalidVoteTarget,

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Failure to turn model output into an [`AnalysisResult`](crate::analysis::AnalysisResult).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("model output contained no JSON object")]
    NoJson,

    #[error("model output was not valid JSON: {0}")]
    InvalidJson(String),

    #[error("model output is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("model output has an invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Errors from the end-to-end analysis pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("submission must contain text or at least one attachment")]
    EmptySubmission,

    #[error("{0}")]
    Validation(String),

    #[error("attachment or chat not found")]
    NotFound,

    #[error("you do not have access to this resource")]
    Forbidden,

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("the analysis service is temporarily unavailable: {0}")]
    LlmTransient(LlmError),

    #[error("the analysis request failed: {0}")]
    LlmPermanent(LlmError),

    #[error("could not read the analysis: {0}")]
    Parse(#[from] ParseError),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<LlmError> for AnalysisError {
    fn from(e: LlmError) -> Self {
        if e.is_transient() {
            AnalysisError::LlmTransient(e)
        } else {
            AnalysisError::LlmPermanent(e)
        }
    }
}
