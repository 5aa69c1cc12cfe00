//! Database error types.

use thiserror::Error;
use tutor_common::ApiError;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQL error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Duplicate(String),
}

impl DbError {
    /// True when the underlying error is a Postgres unique-constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Duplicate(_) => true,
            DbError::Sqlx(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate(msg) => ApiError::BadRequest(msg),
            DbError::Sqlx(e) => ApiError::Database(e),
            other => ApiError::internal("Database operation failed", other),
        }
    }
}
