//! Row types and string-backed enums for the Tutor Cerdas schema.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Enums (stored as TEXT) ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DocumentStatus::Pending),
            "processing" => Some(DocumentStatus::Processing),
            "completed" => Some(DocumentStatus::Completed),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }
}

// ── Profiles ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin.as_str()
    }
}

/// Insert payload for a new profile. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial update applied by admins.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.role.is_none() && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Profile plus activity counters for the admin detail view.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProfileDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub profile: Profile,
    pub chat_count: i64,
    pub session_count: i64,
    pub last_chat_at: Option<DateTime<Utc>>,
}

// ── Sessions & history ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatSession {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SessionSummary {
    pub id: i64,
    pub title: String,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub message_count: i64,
}

/// A saved exchange as shown to its owner.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatRecord {
    pub id: i64,
    pub message: String,
    pub reply: String,
    pub language: String,
    pub sources: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `chat_history`.
#[derive(Debug, Clone)]
pub struct NewChat {
    pub user_id: Uuid,
    pub session_id: i64,
    pub message: String,
    pub reply: String,
    pub language: String,
    pub sources: serde_json::Value,
}

/// One past exchange fed back into the prompt.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct HistoryTurn {
    pub message: String,
    pub reply: String,
}

// ── Admin chat views ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminChatRow {
    pub id: i64,
    pub user_message: String,
    pub ai_response: String,
    pub language: String,
    pub sources: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AdminChatFilter {
    /// ILIKE match on the owner's email.
    pub user_email: Option<String>,
    /// ILIKE match on message or reply.
    pub search: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    pub user_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExportRow {
    pub id: i64,
    pub message: String,
    pub reply: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

// ── Feedback ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Feedback {
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ── Documents ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Document {
    pub id: i64,
    pub filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub status: String,
    pub error_message: Option<String>,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_by: Option<Uuid>,
}

/// Document with per-status chunk counters.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DocumentWithCounts {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub document: Document,
    pub chunk_count: i64,
    pub embedded_count: i64,
    pub pending_count: i64,
    pub failed_count: i64,
}

// ── Stats ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct DashboardStats {
    pub total_users: i64,
    pub active_users: i64,
    pub admin_users: i64,
    pub total_chats: i64,
    pub chats_today: i64,
    pub total_sessions: i64,
    pub total_documents: i64,
    pub completed_documents: i64,
    pub failed_documents: i64,
    pub total_chunks: i64,
    pub embedded_chunks: i64,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LanguageCount {
    pub language: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopUser {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub chat_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentChat {
    pub id: i64,
    pub message: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsOverview {
    pub chats_per_day: Vec<DailyCount>,
    pub languages: Vec<LanguageCount>,
    pub top_users: Vec<TopUser>,
    pub recent_chats: Vec<RecentChat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_text() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_document_status_parse_rejects_unknown() {
        assert_eq!(DocumentStatus::parse("completed"), Some(DocumentStatus::Completed));
        assert_eq!(DocumentStatus::parse("done"), None);
    }

    #[test]
    fn test_profile_serialization_hides_password_hash() {
        let profile = Profile {
            id: Uuid::new_v4(),
            email: "siti@example.com".to_string(),
            full_name: "Siti".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: "user".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "siti@example.com");
        assert!(!profile.is_admin());
    }

    #[test]
    fn test_empty_profile_update() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate { is_active: Some(false), ..Default::default() };
        assert!(!update.is_empty());
    }
}
