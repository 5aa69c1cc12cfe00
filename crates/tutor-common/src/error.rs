//! API error type shared by every handler.
//!
//! Handlers return `Result<T, ApiError>`; the `IntoResponse` impl turns each
//! variant into the JSON envelope with the matching status code. Internal
//! failures are logged in full and only a short message reaches the client.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{context}: {detail}")]
    Internal { context: String, detail: String },
}

impl ApiError {
    /// Internal error with a client-facing context line ("Failed to process chat").
    pub fn internal(context: impl Into<String>, detail: impl ToString) -> Self {
        ApiError::Internal { context: context.into(), detail: detail.to_string() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON envelope sent to the client.
    pub fn body(&self) -> Value {
        match self {
            ApiError::Validation(errors) => json!({
                "success": false,
                "message": "Validation failed",
                "errors": errors,
            }),
            ApiError::Database(e) => json!({
                "success": false,
                "message": "Internal server error",
                "error": database_summary(e),
            }),
            ApiError::Internal { context, detail } => {
                json!({ "success": false, "message": context, "error": detail })
            }
            other => json!({ "success": false, "message": other.to_string() }),
        }
    }
}

/// Short, driver-free description of a database failure.
fn database_summary(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            "Database unavailable"
        }
        sqlx::Error::RowNotFound => "Record not found",
        _ => "Database query failed",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Database(e) => tracing::error!(error = %e, "database error"),
            ApiError::Internal { context, detail } => {
                tracing::error!(context = %context, detail = %detail, "internal error")
            }
            _ => {}
        }
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Malformed JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!(error = ?e, "converting anyhow error to ApiError::Internal");
        ApiError::internal("Internal server error", e)
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Validation(vec![]).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::internal("Failed to process chat", "boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_display_keeps_context() {
        let e = ApiError::internal("Failed to get chats", "connection reset");
        assert_eq!(e.to_string(), "Failed to get chats: connection reset");
        assert_eq!(e.body()["error"], "connection reset");
    }

    #[test]
    fn test_database_body_hides_driver_detail() {
        let body = ApiError::Database(sqlx::Error::PoolTimedOut).body();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["error"], "Database unavailable");

        let body = ApiError::Database(sqlx::Error::Protocol("secret relation".into())).body();
        assert_eq!(body["error"], "Database query failed");
        assert!(!body.to_string().contains("secret relation"));
    }
}
