//! Profile (user account) repository.

use crate::error::{DbError, Result};
use crate::filter::Where;
use crate::schema::{NewProfile, Profile, ProfileDetail, ProfileUpdate, UserFilter};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tutor_common::Page;
use uuid::Uuid;

const PROFILE_COLUMNS: &str =
    "id, email, full_name, password_hash, role, is_active, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    /// Insert a profile. A taken email surfaces as `DbError::Duplicate`.
    pub async fn create(&self, new: &NewProfile) -> Result<Profile> {
        let result = sqlx::query_as::<_, Profile>(&format!(
            "INSERT INTO profiles (email, full_name, password_hash, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(&new.email)
        .bind(&new.full_name)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(profile) => Ok(profile),
            Err(e) => {
                let err = DbError::from(e);
                if err.is_unique_violation() {
                    Err(DbError::Duplicate("Email already registered".to_string()))
                } else {
                    Err(err)
                }
            }
        }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    /// Profile with chat and session counters.
    pub async fn detail(&self, id: Uuid) -> Result<Option<ProfileDetail>> {
        let detail = sqlx::query_as::<_, ProfileDetail>(
            r#"
            SELECT p.id, p.email, p.full_name, p.password_hash, p.role, p.is_active,
                   p.created_at, p.updated_at,
                   (SELECT COUNT(*) FROM chat_history ch WHERE ch.user_id = p.id)  AS chat_count,
                   (SELECT COUNT(*) FROM chat_sessions cs WHERE cs.user_id = p.id) AS session_count,
                   (SELECT MAX(ch.created_at) FROM chat_history ch WHERE ch.user_id = p.id) AS last_chat_at
            FROM profiles p
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(detail)
    }

    /// Filtered, paginated listing ordered by newest first.
    pub async fn list(&self, filter: &UserFilter, page: Page) -> Result<(Vec<Profile>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM profiles");
        push_user_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {PROFILE_COLUMNS} FROM profiles"));
        push_user_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let users = select.build_query_as::<Profile>().fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    /// Apply a partial update. Returns `None` when the id is unknown.
    pub async fn update(&self, id: Uuid, update: &ProfileUpdate) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles SET
                full_name  = COALESCE($2, full_name),
                role       = COALESCE($3, role),
                is_active  = COALESCE($4, is_active),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .bind(update.full_name.as_deref())
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    /// Delete a profile; sessions, history and feedback cascade.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}

fn push_user_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    let mut clause = Where::new();
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search);
        clause.next(qb);
        qb.push("(email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR full_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(role) = filter.role {
        clause.next(qb);
        qb.push("role = ").push_bind(role.as_str());
    }
    if let Some(active) = filter.is_active {
        clause.next(qb);
        qb.push("is_active = ").push_bind(active);
    }
}
