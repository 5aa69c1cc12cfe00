//! The `{ success, data | message }` JSON envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// Successful response carrying a `data` payload.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { status: StatusCode::OK, data }
    }

    pub fn created(data: T) -> Self {
        Self { status: StatusCode::CREATED, data }
    }

    pub fn accepted(data: T) -> Self {
        Self { status: StatusCode::ACCEPTED, data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "success": true, "data": self.data }))).into_response()
    }
}

/// Successful response with only a human-readable message.
#[derive(Debug)]
pub struct ApiMessage(pub String);

impl ApiMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl IntoResponse for ApiMessage {
    fn into_response(self) -> Response {
        Json(json!({ "success": true, "message": self.0 })).into_response()
    }
}
