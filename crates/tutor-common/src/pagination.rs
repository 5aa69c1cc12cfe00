//! Page/limit parsing shared by every list endpoint.

use serde::Serialize;

use crate::error::FieldError;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, limit: DEFAULT_LIMIT }
    }
}

impl Page {
    /// Parse raw `page` / `limit` query values.
    ///
    /// Absent values fall back to page 1 and limit 20. Present values must be
    /// integers, `page >= 1` and `1 <= limit <= 100`.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();

        let page = match non_empty(page) {
            None => 1,
            Some(raw) => match raw.parse::<i64>() {
                Ok(p) if p >= 1 => p,
                _ => {
                    errors.push(FieldError::new("page", "Page must be positive integer"));
                    1
                }
            },
        };

        let limit = match non_empty(limit) {
            None => DEFAULT_LIMIT,
            Some(raw) => match raw.parse::<i64>() {
                Ok(l) if (1..=MAX_LIMIT).contains(&l) => l,
                _ => {
                    errors.push(FieldError::new("limit", "Limit must be 1-100"));
                    DEFAULT_LIMIT
                }
            },
        };

        if errors.is_empty() && (page - 1).checked_mul(limit).is_none() {
            errors.push(FieldError::new("page", "Page is out of range"));
        }

        if errors.is_empty() {
            Ok(Self { page, limit })
        } else {
            Err(errors)
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn with_total(&self, total: i64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: total_pages(total, self.limit),
        }
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Pagination block returned alongside list payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 || total <= 0 {
        return 0;
    }
    (total - 1) / limit + 1
}
