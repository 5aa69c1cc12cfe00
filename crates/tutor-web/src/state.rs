//! Shared application state for the web server.

use std::sync::Arc;

use tutor_config::Config;
use tutor_db::{
    AdminChatRepository, ChatRepository, Database, DocumentRepository, FeedbackRepository,
    ProfileRepository, StatsRepository,
};
use tutor_rag::{RagEngine, RagError};

use crate::auth::{AccountSource, TokenService};

/// Shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub profiles: ProfileRepository,
    pub chats: ChatRepository,
    pub feedback: FeedbackRepository,
    pub documents: DocumentRepository,
    pub admin_chats: AdminChatRepository,
    pub stats: StatsRepository,
    pub rag: RagEngine,
    pub tokens: TokenService,
    pub accounts: Arc<dyn AccountSource>,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Result<Self, RagError> {
        let rag = RagEngine::from_config(&config.llm, &config.indexer)?;
        Ok(Self::with_rag(config, db, rag))
    }

    /// Same as `new` but with a caller-built RAG engine.
    pub fn with_rag(config: Config, db: Database, rag: RagEngine) -> Self {
        let pool = db.pool().clone();
        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl_hours);
        let profiles = ProfileRepository::new(pool.clone());
        Self {
            accounts: Arc::new(profiles.clone()),
            profiles,
            chats: ChatRepository::new(pool.clone()),
            feedback: FeedbackRepository::new(pool.clone()),
            documents: DocumentRepository::new(pool.clone()),
            admin_chats: AdminChatRepository::new(pool.clone()),
            stats: StatsRepository::new(pool),
            config,
            db,
            rag,
            tokens,
        }
    }

    /// Replace where the auth guard looks accounts up.
    pub fn with_accounts(mut self, accounts: Arc<dyn AccountSource>) -> Self {
        self.accounts = accounts;
        self
    }
}

pub type SharedState = Arc<AppState>;
