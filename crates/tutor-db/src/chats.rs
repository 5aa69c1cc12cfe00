//! Chat sessions and chat history, scoped to their owner.

use crate::error::Result;
use crate::schema::{ChatRecord, ChatSession, HistoryTurn, NewChat, SessionSummary};
use sqlx::PgPool;
use tutor_common::Page;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    // ── Sessions ─────────────────────────────────────────────────────────────

    /// Start a new session and return its id.
    pub async fn create_session(&self, user_id: Uuid, title: &str) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO chat_sessions (user_id, title, last_message_at)
             VALUES ($1, $2, NOW())
             RETURNING id",
        )
        .bind(user_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await?;
        tracing::debug!(session_id = id, %user_id, "chat session created");
        Ok(id)
    }

    /// Bump `last_message_at` if the session belongs to `user_id`.
    /// Returns false when the session is missing or owned by someone else.
    pub async fn touch_session(&self, session_id: i64, user_id: Uuid) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE chat_sessions SET last_message_at = NOW()
             WHERE id = $1 AND user_id = $2",
        )
        .bind(session_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated > 0)
    }

    pub async fn list_sessions(&self, user_id: Uuid, limit: i64) -> Result<Vec<SessionSummary>> {
        let sessions = sqlx::query_as::<_, SessionSummary>(
            r#"
            SELECT cs.id, cs.title, cs.last_message_at, cs.created_at,
                   COUNT(ch.id) AS message_count
            FROM chat_sessions cs
            LEFT JOIN chat_history ch ON cs.id = ch.session_id
            WHERE cs.user_id = $1
            GROUP BY cs.id, cs.title, cs.last_message_at, cs.created_at
            ORDER BY cs.last_message_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    pub async fn find_session(
        &self,
        session_id: i64,
        user_id: Uuid,
    ) -> Result<Option<ChatSession>> {
        let session = sqlx::query_as::<_, ChatSession>(
            "SELECT id, title, created_at, last_message_at
             FROM chat_sessions
             WHERE id = $1 AND user_id = $2",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    /// All messages of a session, oldest first.
    pub async fn session_messages(&self, session_id: i64) -> Result<Vec<ChatRecord>> {
        let messages = sqlx::query_as::<_, ChatRecord>(
            "SELECT id, message, reply, language, sources, created_at
             FROM chat_history
             WHERE session_id = $1
             ORDER BY created_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    /// Delete a session and, by cascade, its messages.
    pub async fn delete_session(&self, session_id: i64, user_id: Uuid) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM chat_sessions WHERE id = $1 AND user_id = $2")
            .bind(session_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    /// The last `window` exchanges of a session in chronological order.
    pub async fn recent_turns(&self, session_id: i64, window: i64) -> Result<Vec<HistoryTurn>> {
        if window <= 0 {
            return Ok(Vec::new());
        }
        let mut turns = sqlx::query_as::<_, HistoryTurn>(
            "SELECT message, reply
             FROM chat_history
             WHERE session_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
        )
        .bind(session_id)
        .bind(window)
        .fetch_all(&self.pool)
        .await?;
        turns.reverse();
        Ok(turns)
    }

    // ── History ──────────────────────────────────────────────────────────────

    pub async fn insert_chat(&self, chat: &NewChat) -> Result<ChatRecord> {
        let record = sqlx::query_as::<_, ChatRecord>(
            "INSERT INTO chat_history (user_id, session_id, message, reply, language, sources, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, NOW())
             RETURNING id, message, reply, language, sources, created_at",
        )
        .bind(chat.user_id)
        .bind(chat.session_id)
        .bind(&chat.message)
        .bind(&chat.reply)
        .bind(&chat.language)
        .bind(&chat.sources)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn list_history(&self, user_id: Uuid, page: Page) -> Result<(Vec<ChatRecord>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_history WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let chats = sqlx::query_as::<_, ChatRecord>(
            "SELECT id, message, reply, language, sources, created_at
             FROM chat_history
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((chats, total))
    }

    pub async fn find_chat(&self, chat_id: i64, user_id: Uuid) -> Result<Option<ChatRecord>> {
        let chat = sqlx::query_as::<_, ChatRecord>(
            "SELECT id, message, reply, language, sources, created_at
             FROM chat_history
             WHERE id = $1 AND user_id = $2",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(chat)
    }

    pub async fn delete_chat(&self, chat_id: i64, user_id: Uuid) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM chat_history WHERE id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    /// Delete every exchange the user owns. Returns the number removed.
    pub async fn delete_all_history(&self, user_id: Uuid) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM chat_history WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        tracing::info!(%user_id, deleted, "chat history cleared");
        Ok(deleted)
    }
}
