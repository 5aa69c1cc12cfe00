//! User chat endpoints: ask, sessions, history and feedback.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Extension;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tutor_common::{ApiError, ApiMessage, ApiResponse, FieldError};
use tutor_db::NewChat;
use tutor_rag::ChatTurn;

use crate::auth::AuthUser;
use crate::extract::{ensure_valid, page_from, parse_id, AppJson, AppQuery};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub chat_id: i64,
    pub session_id: i64,
    pub message: String,
    pub reply: String,
    pub language: String,
    pub sources: Value,
    pub context_used: bool,
    pub history_used: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub comment: Option<String>,
}

const MAX_COMMENT_CHARS: usize = 1000;

/// Integral JSON numbers only; `12.0` counts, `1.5` does not.
fn integral(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| {
        v.as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 1.0 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// `null`/absent is a new session, a positive JSON integer an existing one.
fn parse_session_id(raw: Option<&Value>) -> Result<Option<i64>, FieldError> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match integral(v) {
            Some(id) if id > 0 => Ok(Some(id)),
            _ => Err(FieldError::new(
                "session_id",
                "Session ID must be a positive integer or null",
            )),
        },
    }
}

fn session_title(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}

/// POST /api/chat - Ask a question, optionally continuing a session
pub async fn send_message(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    AppJson(req): AppJson<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let limits = &state.config.chat;
    let message = req.message.as_deref().unwrap_or("").trim().to_string();

    let mut errors = Vec::new();
    let len = message.chars().count();
    if len == 0 || len > limits.max_message_chars {
        errors.push(FieldError::new(
            "message",
            format!("Message required (1-{} characters)", limits.max_message_chars),
        ));
    }
    let requested = parse_session_id(req.session_id.as_ref()).unwrap_or_else(|e| {
        errors.push(e);
        None
    });
    ensure_valid(errors)?;

    let (session_id, history) = match requested {
        Some(id) => {
            if !state.chats.touch_session(id, user.id).await? {
                return Err(ApiError::NotFound("Session not found".to_string()));
            }
            let turns = state.chats.recent_turns(id, limits.history_window).await?;
            let history: Vec<ChatTurn> = turns
                .into_iter()
                .map(|t| ChatTurn::new(t.message, t.reply))
                .collect();
            (id, history)
        }
        None => {
            let title = session_title(&message, limits.session_title_chars);
            (state.chats.create_session(user.id, &title).await?, Vec::new())
        }
    };

    let answer = state.rag.generate_response(&message, None, &history).await?;
    let sources = serde_json::to_value(&answer.sources)
        .map_err(|e| ApiError::internal("Failed to process chat", e))?;

    let chat = state
        .chats
        .insert_chat(&NewChat {
            user_id: user.id,
            session_id,
            message,
            reply: answer.reply,
            language: answer.language.code().to_string(),
            sources,
        })
        .await?;

    tracing::info!(
        user_id = %user.id,
        session_id,
        chat_id = chat.id,
        context_used = answer.context_used,
        history_used = answer.history_used,
        "chat answered"
    );

    Ok(ApiResponse::ok(ChatReply {
        chat_id: chat.id,
        session_id,
        message: chat.message,
        reply: chat.reply,
        language: chat.language,
        sources: chat.sources,
        context_used: answer.context_used,
        history_used: answer.history_used,
        created_at: chat.created_at,
    }))
}

/// GET /api/chat/sessions - Most recently active sessions
pub async fn list_sessions(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state
        .chats
        .list_sessions(user.id, state.config.chat.sessions_limit)
        .await?;
    Ok(ApiResponse::ok(json!({ "sessions": sessions })))
}

/// GET /api/chat/sessions/{id} - One session with all its messages
pub async fn get_session(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid session ID")?;
    let session = state
        .chats
        .find_session(id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;
    let messages = state.chats.session_messages(id).await?;
    Ok(ApiResponse::ok(json!({ "session": session, "messages": messages })))
}

/// DELETE /api/chat/sessions/{id} - Delete a session and its messages
pub async fn delete_session(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid session ID")?;
    if !state.chats.delete_session(id, user.id).await? {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }
    Ok(ApiMessage::new("Session deleted successfully"))
}

/// GET /api/chat/history - Paginated history, newest first
pub async fn list_history(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    AppQuery(query): AppQuery<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = Vec::new();
    let page = page_from(query.page.as_deref(), query.limit.as_deref(), &mut errors);
    ensure_valid(errors)?;

    let (chats, total) = state.chats.list_history(user.id, page).await?;
    Ok(ApiResponse::ok(json!({ "chats": chats, "pagination": page.with_total(total) })))
}

/// GET /api/chat/history/{id} - One exchange
pub async fn get_chat(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid chat ID")?;
    let chat = state
        .chats
        .find_chat(id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat not found".to_string()))?;
    Ok(ApiResponse::ok(chat))
}

/// DELETE /api/chat/history/{id} - Delete one exchange
pub async fn delete_chat(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid chat ID")?;
    if !state.chats.delete_chat(id, user.id).await? {
        return Err(ApiError::NotFound("Chat not found".to_string()));
    }
    Ok(ApiMessage::new("Chat deleted successfully"))
}

/// DELETE /api/chat/history - Delete all of the caller's history
pub async fn delete_all_history(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.chats.delete_all_history(user.id).await?;
    Ok(ApiResponse::ok(json!({
        "message": "All chats deleted successfully",
        "deleted": deleted,
    })))
}

/// POST /api/chat/history/{id}/feedback - Rate an answer (1-5)
pub async fn submit_feedback(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    AppJson(req): AppJson<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid chat ID")?;

    let mut errors = Vec::new();
    let rating = match req.rating.as_ref().and_then(Value::as_i64) {
        Some(r) if (1..=5).contains(&r) => r as i16,
        _ => {
            errors.push(FieldError::new("rating", "Rating must be an integer between 1 and 5"));
            0
        }
    };
    let comment = req.comment.as_deref().map(str::trim).filter(|c| !c.is_empty());
    if comment.is_some_and(|c| c.chars().count() > MAX_COMMENT_CHARS) {
        errors.push(FieldError::new("comment", "Comment must be at most 1000 characters"));
    }
    ensure_valid(errors)?;

    let feedback = state
        .feedback
        .upsert(id, user.id, rating, comment)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat not found".to_string()))?;
    Ok(ApiResponse::ok(json!({ "feedback": feedback })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_rules() {
        assert_eq!(parse_session_id(None).unwrap(), None);
        assert_eq!(parse_session_id(Some(&Value::Null)).unwrap(), None);
        assert_eq!(parse_session_id(Some(&json!(12))).unwrap(), Some(12));
        assert!(parse_session_id(Some(&json!(0))).is_err());
        assert!(parse_session_id(Some(&json!(-4))).is_err());
        assert!(parse_session_id(Some(&json!("12"))).is_err());
        assert!(parse_session_id(Some(&json!(1.5))).is_err());
        assert_eq!(parse_session_id(Some(&json!(12.0))).unwrap(), Some(12));
        assert!(parse_session_id(Some(&json!(-3.0))).is_err());
        assert!(parse_session_id(Some(&json!(1e300))).is_err());
    }

    #[test]
    fn test_session_title_is_char_safe() {
        let long = "á".repeat(150);
        assert_eq!(session_title(&long, 100).chars().count(), 100);
        assert_eq!(session_title("Halo", 100), "Halo");
    }
}
