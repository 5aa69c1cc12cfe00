use thiserror::Error;
use tutor_common::ApiError;
use tutor_llm::LlmError;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Indexer unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid indexer response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Indexer error [{status}]: {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Error)]
pub enum RagError {
    #[error("Failed to generate response: {0}")]
    Generation(#[from] LlmError),
    #[error("Indexer client setup failed: {0}")]
    Indexer(#[from] IndexerError),
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match &err {
            RagError::Generation(LlmError::Unavailable(_)) => {
                tracing::error!(error = %err, "LLM backend unavailable");
                ApiError::ServiceUnavailable(err.to_string())
            }
            _ => ApiError::internal("Failed to process chat", err),
        }
    }
}

impl From<IndexerError> for ApiError {
    fn from(err: IndexerError) -> Self {
        match err {
            IndexerError::Http(e) => {
                tracing::error!(error = %e, "indexer unreachable");
                ApiError::ServiceUnavailable("Indexer service unavailable".to_string())
            }
            IndexerError::Api { status, message } if (400..500).contains(&status) => {
                ApiError::BadRequest(message)
            }
            other => ApiError::internal("Indexer request failed", other),
        }
    }
}
