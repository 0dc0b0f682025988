//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over repository/storage/credential traits, but AppState
//! pins them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use redflag_core::analysis::retry::RetryPolicy;
use redflag_core::llm::BoxLlmProvider;
use redflag_core::service::analysis::{AnalysisOptions, AnalysisService};
use redflag_core::service::auth::AuthService;
use redflag_core::service::chat::ChatService;
use redflag_core::service::upload::UploadService;
use redflag_core::usage::service::UsageService;
use redflag_infra::config::{database_url, load_config, resolve_data_dir};
use redflag_infra::crypto::Argon2Credentials;
use redflag_infra::email::AppMailer;
use redflag_infra::llm::{UnconfiguredProvider, create_provider};
use redflag_infra::sqlite::chat::SqliteChatRepository;
use redflag_infra::sqlite::pool::DatabasePool;
use redflag_infra::sqlite::upload::SqliteUploadRepository;
use redflag_infra::sqlite::usage::SqliteUsageRepository;
use redflag_infra::sqlite::user::SqliteUserRepository;
use redflag_infra::storage::LocalFileStore;
use redflag_types::config::AppConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteAuthService = AuthService<SqliteUserRepository, Argon2Credentials, AppMailer>;

pub type ConcreteChatService = ChatService<SqliteChatRepository>;

pub type ConcreteUploadService = UploadService<SqliteUploadRepository, LocalFileStore>;

pub type ConcreteUsageService = UsageService<SqliteUsageRepository>;

pub type ConcreteAnalysisService = AnalysisService<
    SqliteUsageRepository,
    SqliteUploadRepository,
    LocalFileStore,
    SqliteChatRepository,
>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<ConcreteAuthService>,
    pub chat_service: Arc<ConcreteChatService>,
    pub upload_service: Arc<ConcreteUploadService>,
    pub usage_service: Arc<ConcreteUsageService>,
    pub analysis_service: Arc<ConcreteAnalysisService>,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB,
    /// build the LLM provider and mailer, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;
        let db_pool = DatabasePool::new(&database_url(&config, &data_dir)).await?;

        let api_key = std::env::var(&config.llm.api_key_env).ok();
        let provider = match create_provider(&config.llm, api_key.as_deref()) {
            Ok(provider) => provider,
            Err(e) => {
                tracing::warn!(
                    env = %config.llm.api_key_env,
                    error = %e,
                    "LLM provider unavailable; analyses will fail until an API key is set"
                );
                BoxLlmProvider::new(UnconfiguredProvider::new(config.llm.model.clone()))
            }
        };

        let mailer = AppMailer::from_config(
            &config.email,
            std::env::var(&config.email.api_key_env).ok(),
        )?;

        Ok(Self::build(config, data_dir, db_pool, provider, mailer))
    }

    /// Wire services over an open pool. Used by `init` and by tests.
    pub fn build(
        config: AppConfig,
        data_dir: PathBuf,
        db_pool: DatabasePool,
        provider: BoxLlmProvider,
        mailer: AppMailer,
    ) -> Self {
        let file_store = LocalFileStore::new(data_dir.join("uploads"));

        let auth_service = AuthService::new(
            SqliteUserRepository::new(db_pool.clone()),
            Argon2Credentials::new(),
            mailer,
            config.auth.clone(),
            config.server.app_url.clone(),
        );

        let chat_service = ChatService::new(SqliteChatRepository::new(db_pool.clone()));

        let upload_service = UploadService::new(
            SqliteUploadRepository::new(db_pool.clone()),
            file_store.clone(),
            config.uploads.max_bytes,
        );

        let usage_service = UsageService::new(
            SqliteUsageRepository::new(db_pool.clone()),
            config.limits.clone(),
        );

        // The analysis service owns its own usage and upload services over
        // the same pool.
        let analysis_service = AnalysisService::new(
            provider,
            UsageService::new(
                SqliteUsageRepository::new(db_pool.clone()),
                config.limits.clone(),
            ),
            UploadService::new(
                SqliteUploadRepository::new(db_pool.clone()),
                file_store,
                config.uploads.max_bytes,
            ),
            SqliteChatRepository::new(db_pool.clone()),
            RetryPolicy::from_config(&config.retry),
            AnalysisOptions::from_config(&config.llm, &config.uploads),
        );

        Self {
            auth_service: Arc::new(auth_service),
            chat_service: Arc::new(chat_service),
            upload_service: Arc::new(upload_service),
            usage_service: Arc::new(usage_service),
            analysis_service: Arc::new(analysis_service),
            config: Arc::new(config),
            data_dir,
            db_pool,
        }
    }
}
