//! Admin chat review and CSV export.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use tutor_common::{ApiError, ApiMessage, ApiResponse, FieldError};
use tutor_db::{AdminChatFilter, ExportFilter, ExportRow};

use crate::extract::{
    ensure_valid, non_blank, optional_date, page_from, parse_id, parse_uuid, AppQuery, DayBound,
};
use crate::state::SharedState;

const CSV_HEADER: &str = "ID,User Name,User Email,Message,Reply,Language,Created At\n";
const LANGUAGES: [&str; 2] = ["id", "en"];

#[derive(Debug, Deserialize)]
pub struct AdminChatQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub user: Option<String>,
    pub search: Option<String>,
    #[serde(rename = "dateFrom")]
    pub date_from: Option<String>,
    #[serde(rename = "dateTo")]
    pub date_to: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

fn checked_language(raw: Option<String>, errors: &mut Vec<FieldError>) -> Option<String> {
    let lang = non_blank(raw)?;
    if LANGUAGES.contains(&lang.as_str()) {
        Some(lang)
    } else {
        errors.push(FieldError::new("language", "Language must be id or en"));
        None
    }
}

/// Quote a CSV text cell: inner quotes doubled, line breaks flattened.
pub fn csv_text(value: &str) -> String {
    let flat = value.replace("\r\n", " ").replace(['\n', '\r'], " ");
    format!("\"{}\"", flat.replace('"', "\"\""))
}

pub fn render_csv(rows: &[ExportRow]) -> String {
    let mut out = String::from(CSV_HEADER);
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            row.id,
            csv_text(row.user_name.as_deref().unwrap_or("")),
            csv_text(row.user_email.as_deref().unwrap_or("")),
            csv_text(&row.message),
            csv_text(&row.reply),
            row.language,
            row.created_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        ));
    }
    out
}

fn export_filter(req: ExportRequest) -> Result<ExportFilter, ApiError> {
    let mut errors = Vec::new();
    let user_id = match non_blank(req.user_id) {
        Some(raw) => match parse_uuid(&raw, "Invalid user ID") {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push(FieldError::new("user_id", "Invalid user ID"));
                None
            }
        },
        None => None,
    };
    let filter = ExportFilter {
        user_id,
        start_date: optional_date(
            req.start_date.as_deref(),
            "start_date",
            DayBound::Start,
            &mut errors,
        ),
        end_date: optional_date(req.end_date.as_deref(), "end_date", DayBound::End, &mut errors),
        language: checked_language(req.language, &mut errors),
    };
    ensure_valid(errors)?;
    Ok(filter)
}

/// GET /api/admin/chats
pub async fn list_chats(
    State(state): State<SharedState>,
    AppQuery(query): AppQuery<AdminChatQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = Vec::new();
    let page = page_from(query.page.as_deref(), query.limit.as_deref(), &mut errors);
    let filter = AdminChatFilter {
        user_email: non_blank(query.user),
        search: non_blank(query.search),
        date_from: optional_date(
            query.date_from.as_deref(),
            "dateFrom",
            DayBound::Start,
            &mut errors,
        ),
        date_to: optional_date(query.date_to.as_deref(), "dateTo", DayBound::End, &mut errors),
        language: checked_language(query.language, &mut errors),
    };
    ensure_valid(errors)?;

    let (chats, total) = state.admin_chats.list(&filter, page).await?;
    Ok(ApiResponse::ok(json!({ "chats": chats, "pagination": page.with_total(total) })))
}

/// GET /api/admin/chats/{id}
pub async fn get_chat(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid chat ID")?;
    let chat = state
        .admin_chats
        .find(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Chat not found".to_string()))?;
    let feedback = state.feedback.for_chat(id).await?;
    Ok(ApiResponse::ok(json!({ "chat": chat, "feedback": feedback })))
}

/// POST /api/admin/chats/export
///
/// An empty body exports everything.
pub async fn export_chats(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: ExportRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ExportRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Malformed JSON body: {e}")))?
    };
    let filter = export_filter(req)?;

    let rows = state.admin_chats.export(&filter).await?;
    let csv = render_csv(&rows);
    tracing::info!(rows = rows.len(), "chats exported");

    let disposition = format!(
        "attachment; filename=chats-export-{}.csv",
        chrono::Utc::now().timestamp_millis()
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

/// DELETE /api/admin/chats/{id}
pub async fn delete_chat(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id, "Invalid chat ID")?;
    if !state.admin_chats.delete(id).await? {
        return Err(ApiError::NotFound("Chat not found".to_string()));
    }
    Ok(ApiMessage::new("Chat deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(name: Option<&str>, message: &str) -> ExportRow {
        ExportRow {
            id: 7,
            message: message.to_string(),
            reply: "Fotosintesis adalah...".to_string(),
            language: "id".to_string(),
            created_at: chrono::Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap(),
            user_name: name.map(str::to_string),
            user_email: Some("siswa@sekolah.id".to_string()),
        }
    }

    #[test]
    fn test_csv_text_escaping() {
        assert_eq!(csv_text("plain"), "\"plain\"");
        assert_eq!(csv_text("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_text("line one\nline two"), "\"line one line two\"");
        assert_eq!(csv_text("a\r\nb"), "\"a b\"");
    }

    #[test]
    fn test_render_csv() {
        let csv = render_csv(&[row(Some("Budi"), "Apa itu\n\"fotosintesis\"?"), row(None, "Hi")]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ID,User Name,User Email,Message,Reply,Language,Created At");
        assert_eq!(
            lines[1],
            "7,\"Budi\",\"siswa@sekolah.id\",\"Apa itu \"\"fotosintesis\"\"?\",\
             \"Fotosintesis adalah...\",id,2025-03-01T08:30:00.000Z"
        );
        assert!(lines[2].starts_with("7,\"\",\"siswa@sekolah.id\",\"Hi\""));
    }

    #[test]
    fn test_empty_export_is_header_only() {
        assert_eq!(render_csv(&[]), CSV_HEADER);
    }

    #[test]
    fn test_export_filter_validation() {
        let filter = export_filter(ExportRequest {
            user_id: None,
            start_date: Some("2025-03-01".into()),
            end_date: Some("2025-03-31".into()),
            language: Some("en".into()),
        })
        .unwrap();
        assert!(filter.start_date.unwrap() < filter.end_date.unwrap());
        assert_eq!(filter.language.as_deref(), Some("en"));

        let err = export_filter(ExportRequest {
            user_id: Some("not-a-uuid".into()),
            language: Some("fr".into()),
            ..Default::default()
        })
        .unwrap_err();
        match err {
            ApiError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
