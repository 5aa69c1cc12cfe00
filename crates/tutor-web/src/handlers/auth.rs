//! Registration, login and the current-user lookup.

use std::sync::OnceLock;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Extension;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tutor_common::{ApiError, ApiResponse, FieldError};
use tutor_db::{NewProfile, Role};

use crate::auth::{hash_password, verify_password, AuthUser};
use crate::extract::{ensure_valid, AppJson};
use crate::state::SharedState;

const MIN_PASSWORD_CHARS: usize = 6;
const MAX_NAME_CHARS: usize = 100;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex compiles"))
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && email_regex().is_match(email)
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, alias = "full_name")]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/auth/register - Create a regular user account
pub async fn register(
    State(state): State<SharedState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();

    let mut errors = Vec::new();
    let name_len = name.chars().count();
    if name_len == 0 || name_len > MAX_NAME_CHARS {
        errors.push(FieldError::new("name", "Name is required (max 100 characters)"));
    }
    if !is_valid_email(&email) {
        errors.push(FieldError::new("email", "Valid email is required"));
    }
    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        errors.push(FieldError::new("password", "Password must be at least 6 characters"));
    }
    ensure_valid(errors)?;

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal("Registration failed", e))??;

    let profile = state
        .profiles
        .create(&NewProfile { email, full_name: name, password_hash, role: Role::User })
        .await?;

    tracing::info!(user_id = %profile.id, "user registered");
    Ok(ApiResponse::created(json!({ "user": profile })))
}

/// POST /api/auth/login - Exchange credentials for an access token
pub async fn login(
    State(state): State<SharedState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(vec![FieldError::new(
            "email",
            "Email and password are required",
        )]));
    }

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let profile = state.profiles.find_by_email(&email).await?.ok_or_else(invalid)?;

    let password = req.password;
    let hash = profile.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::internal("Login failed", e))?;
    if !matches {
        tracing::info!(%email, "failed login attempt");
        return Err(invalid());
    }
    if !profile.is_active {
        return Err(ApiError::Forbidden("Account is deactivated".to_string()));
    }

    let token = state.tokens.issue(profile.id, &profile.email, &profile.role)?;
    tracing::info!(user_id = %profile.id, role = %profile.role, "user logged in");
    Ok(ApiResponse::ok(json!({ "user": profile, "token": token })))
}

/// GET /api/auth/me - Profile of the token holder
pub async fn me(
    State(state): State<SharedState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .profiles
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(ApiResponse::ok(json!({ "user": profile })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("siswa@sekolah.sch.id"));
        assert!(!is_valid_email("siswa"));
        assert!(!is_valid_email("siswa@sekolah"));
        assert!(!is_valid_email("a b@c.d"));
    }
}
