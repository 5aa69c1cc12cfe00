//! Cross-user chat queries for the admin console.

use crate::error::Result;
use crate::filter::Where;
use crate::schema::{AdminChatFilter, AdminChatRow, ExportFilter, ExportRow};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tutor_common::Page;

const ADMIN_CHAT_SELECT: &str = r#"
    SELECT ch.id,
           ch.message    AS user_message,
           ch.reply      AS ai_response,
           ch.language,
           ch.sources,
           ch.created_at,
           p.id          AS user_id,
           p.full_name   AS user_name,
           p.email       AS user_email
    FROM chat_history ch
    LEFT JOIN profiles p ON ch.user_id = p.id
"#;

#[derive(Clone, Debug)]
pub struct AdminChatRepository {
    pool: PgPool,
}

impl AdminChatRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    /// Filtered, paginated listing of every user's chats, newest first.
    pub async fn list(
        &self,
        filter: &AdminChatFilter,
        page: Page,
    ) -> Result<(Vec<AdminChatRow>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM chat_history ch LEFT JOIN profiles p ON ch.user_id = p.id",
        );
        push_admin_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(ADMIN_CHAT_SELECT);
        push_admin_filter(&mut select, filter);
        select
            .push(" ORDER BY ch.created_at DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let chats = select.build_query_as::<AdminChatRow>().fetch_all(&self.pool).await?;

        Ok((chats, total))
    }

    pub async fn find(&self, id: i64) -> Result<Option<AdminChatRow>> {
        let mut qb = QueryBuilder::<Postgres>::new(ADMIN_CHAT_SELECT);
        qb.push(" WHERE ch.id = ").push_bind(id);
        let chat = qb.build_query_as::<AdminChatRow>().fetch_optional(&self.pool).await?;
        Ok(chat)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM chat_history WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted > 0 {
            tracing::info!(chat_id = id, "chat deleted by admin");
        }
        Ok(deleted > 0)
    }

    /// Rows for the CSV export, newest first.
    pub async fn export(&self, filter: &ExportFilter) -> Result<Vec<ExportRow>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT ch.id, ch.message, ch.reply, ch.language, ch.created_at,
                   p.full_name AS user_name, p.email AS user_email
            FROM chat_history ch
            LEFT JOIN profiles p ON ch.user_id = p.id
            "#,
        );
        let mut clause = Where::new();
        if let Some(user_id) = filter.user_id {
            clause.next(&mut qb);
            qb.push("ch.user_id = ").push_bind(user_id);
        }
        if let Some(start) = filter.start_date {
            clause.next(&mut qb);
            qb.push("ch.created_at >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            clause.next(&mut qb);
            qb.push("ch.created_at <= ").push_bind(end);
        }
        if let Some(language) = &filter.language {
            clause.next(&mut qb);
            qb.push("ch.language = ").push_bind(language.clone());
        }
        qb.push(" ORDER BY ch.created_at DESC");

        let rows = qb.build_query_as::<ExportRow>().fetch_all(&self.pool).await?;
        tracing::info!(rows = rows.len(), "chat export prepared");
        Ok(rows)
    }
}

fn push_admin_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &AdminChatFilter) {
    let mut clause = Where::new();
    if let Some(email) = &filter.user_email {
        clause.next(qb);
        qb.push("p.email ILIKE ").push_bind(format!("%{}%", email));
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        clause.next(qb);
        qb.push("(ch.message ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR ch.reply ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(from) = filter.date_from {
        clause.next(qb);
        qb.push("ch.created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        clause.next(qb);
        qb.push("ch.created_at <= ").push_bind(to);
    }
    if let Some(language) = &filter.language {
        clause.next(qb);
        qb.push("ch.language = ").push_bind(language.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_filter_joins_conditions_in_order() {
        let filter = AdminChatFilter {
            user_email: Some("budi".into()),
            search: Some("fotosintesis".into()),
            language: Some("id".into()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM chat_history ch");
        push_admin_filter(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM chat_history ch WHERE p.email ILIKE $1 \
             AND (ch.message ILIKE $2 OR ch.reply ILIKE $3) AND ch.language = $4"
        );
    }

    #[test]
    fn test_empty_admin_filter_adds_nothing() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1");
        push_admin_filter(&mut qb, &AdminChatFilter::default());
        assert_eq!(qb.sql(), "SELECT 1");
    }
}
