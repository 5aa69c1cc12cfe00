//! Tutor Cerdas Database Layer
//!
//! PostgreSQL persistence through a shared `sqlx` pool.
//!
//! # Tables
//!
//!   profiles       user accounts (argon2 hashes, role, active flag)
//!   chat_sessions  conversation threads owned by a profile
//!   chat_history   one row per question/answer exchange
//!   documents      uploaded PDFs and their indexing status
//!   chunks         text chunks written by the external indexer
//!   feedback       per-chat ratings
//!
//! Every repository wraps a cloned `PgPool` and uses runtime `sqlx::query_as`.
//!
//! # Example
//!
//! ```rust,no_run
//! use tutor_db::{ChatRepository, Database};
//! use tutor_config::DatabaseConfig;
//!
//! # async fn run(config: DatabaseConfig, user_id: uuid::Uuid) -> tutor_db::Result<()> {
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let chats = ChatRepository::new(db.pool().clone());
//! let sessions = chats.list_sessions(user_id, 50).await?;
//! println!("{} sessions", sessions.len());
//! # Ok(())
//! # }
//! ```

pub mod admin_chats;
pub mod chats;
pub mod database;
pub mod documents;
pub mod error;
pub mod feedback;
pub mod profiles;
pub mod schema;
pub mod stats;

mod filter;

pub use admin_chats::AdminChatRepository;
pub use chats::ChatRepository;
pub use database::{Database, MIGRATOR};
pub use documents::DocumentRepository;
pub use error::{DbError, Result};
pub use feedback::FeedbackRepository;
pub use profiles::ProfileRepository;
pub use schema::*;
pub use stats::StatsRepository;
