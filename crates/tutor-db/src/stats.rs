//! Aggregate counters for the admin dashboard.

use crate::error::Result;
use crate::schema::{DailyCount, DashboardStats, LanguageCount, RecentChat, StatsOverview, TopUser};
use sqlx::PgPool;

#[derive(Clone, Debug)]
pub struct StatsRepository {
    pool: PgPool,
}

impl StatsRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn dashboard(&self) -> Result<DashboardStats> {
        let stats = sqlx::query_as::<_, DashboardStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM profiles)                                   AS total_users,
                (SELECT COUNT(*) FROM profiles WHERE is_active)                   AS active_users,
                (SELECT COUNT(*) FROM profiles WHERE role = 'admin')              AS admin_users,
                (SELECT COUNT(*) FROM chat_history)                               AS total_chats,
                (SELECT COUNT(*) FROM chat_history
                  WHERE created_at >= date_trunc('day', NOW()))                   AS chats_today,
                (SELECT COUNT(*) FROM chat_sessions)                              AS total_sessions,
                (SELECT COUNT(*) FROM documents)                                  AS total_documents,
                (SELECT COUNT(*) FROM documents WHERE status = 'completed')       AS completed_documents,
                (SELECT COUNT(*) FROM documents WHERE status = 'failed')          AS failed_documents,
                (SELECT COUNT(*) FROM chunks)                                     AS total_chunks,
                (SELECT COUNT(*) FROM chunks WHERE status = 'embedded')           AS embedded_chunks,
                (SELECT AVG(rating)::FLOAT8 FROM feedback)                        AS average_rating
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    pub async fn overview(&self) -> Result<StatsOverview> {
        let chats_per_day = sqlx::query_as::<_, DailyCount>(
            r#"
            SELECT d::date AS day, COUNT(ch.id) AS count
            FROM generate_series(CURRENT_DATE::timestamp - INTERVAL '6 days', CURRENT_DATE::timestamp, INTERVAL '1 day') AS d
            LEFT JOIN chat_history ch ON ch.created_at::date = d::date
            GROUP BY d
            ORDER BY d
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let languages = sqlx::query_as::<_, LanguageCount>(
            "SELECT language, COUNT(*) AS count
             FROM chat_history
             GROUP BY language
             ORDER BY count DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let top_users = sqlx::query_as::<_, TopUser>(
            r#"
            SELECT p.id AS user_id, p.full_name, p.email, COUNT(ch.id) AS chat_count
            FROM profiles p
            JOIN chat_history ch ON ch.user_id = p.id
            GROUP BY p.id, p.full_name, p.email
            ORDER BY chat_count DESC
            LIMIT 5
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let recent_chats = sqlx::query_as::<_, RecentChat>(
            r#"
            SELECT ch.id, ch.message, ch.language, ch.created_at, p.email AS user_email
            FROM chat_history ch
            LEFT JOIN profiles p ON ch.user_id = p.id
            ORDER BY ch.created_at DESC
            LIMIT 5
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(StatsOverview { chats_per_day, languages, top_users, recent_chats })
    }
}
