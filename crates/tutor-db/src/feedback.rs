//! Ratings users leave on individual replies.

use crate::error::Result;
use crate::schema::Feedback;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct FeedbackRepository {
    pool: PgPool,
}

impl FeedbackRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    /// Insert or replace the user's feedback on one of their own chats.
    /// Returns `None` when the chat does not exist or belongs to someone else.
    pub async fn upsert(
        &self,
        chat_id: i64,
        user_id: Uuid,
        rating: i16,
        comment: Option<&str>,
    ) -> Result<Option<Feedback>> {
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (chat_id, user_id, rating, comment)
            SELECT $1, $2, $3, $4
            WHERE EXISTS (SELECT 1 FROM chat_history WHERE id = $1 AND user_id = $2)
            ON CONFLICT (chat_id, user_id)
                DO UPDATE SET rating = EXCLUDED.rating,
                              comment = EXCLUDED.comment,
                              created_at = NOW()
            RETURNING rating, comment, created_at
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feedback)
    }

    /// First feedback row for a chat, if any.
    pub async fn for_chat(&self, chat_id: i64) -> Result<Option<Feedback>> {
        let feedback = sqlx::query_as::<_, Feedback>(
            "SELECT rating, comment, created_at
             FROM feedback
             WHERE chat_id = $1
             ORDER BY created_at ASC
             LIMIT 1",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feedback)
    }
}
