//! Extractors and small parsers that report failures in the API envelope.

use axum::extract::{FromRequest, FromRequestParts};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tutor_common::{ApiError, FieldError, Page};
use uuid::Uuid;

/// `axum::Json` with rejections mapped to `ApiError`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// `axum::extract::Query` with rejections mapped to `ApiError`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

/// Positive integer path id, or 400 with `message`.
pub fn parse_id(raw: &str, message: &str) -> Result<i64, ApiError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::BadRequest(message.to_string())),
    }
}

pub fn parse_uuid(raw: &str, message: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(message.to_string()))
}

/// Validate `page`/`limit`, pushing any failures into `errors`.
pub fn page_from(page: Option<&str>, limit: Option<&str>, errors: &mut Vec<FieldError>) -> Page {
    Page::parse(page, limit).unwrap_or_else(|mut e| {
        errors.append(&mut e);
        Page::default()
    })
}

/// Which end of the day a bare `YYYY-MM-DD` stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBound {
    Start,
    End,
}

/// Parse an RFC 3339 timestamp or a plain date.
pub fn parse_date(raw: &str, bound: DayBound) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = match bound {
        DayBound::Start => NaiveTime::MIN,
        DayBound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?,
    };
    Some(date.and_time(time).and_utc())
}

/// Optional date field: absent or blank is `None`, garbage records a field error.
pub fn optional_date(
    raw: Option<&str>,
    field: &str,
    bound: DayBound,
    errors: &mut Vec<FieldError>,
) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    let parsed = parse_date(raw, bound);
    if parsed.is_none() {
        errors.push(FieldError::new(field, "Must be an ISO 8601 date"));
    }
    parsed
}

/// Trimmed, non-empty query text.
pub fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Return `Validation` when any field failed.
pub fn ensure_valid(errors: Vec<FieldError>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}
