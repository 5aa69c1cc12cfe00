//! Admin user management.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Extension;
use serde::Deserialize;
use serde_json::{json, Value};
use tutor_common::{ApiError, ApiMessage, ApiResponse, FieldError};
use tutor_db::{ProfileUpdate, Role, UserFilter};

use crate::auth::AuthUser;
use crate::extract::{ensure_valid, non_blank, page_from, parse_uuid, AppJson, AppQuery};
use crate::state::SharedState;

const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<Value>,
    #[serde(default)]
    pub full_name: Option<String>,
}

fn parse_role(raw: &str, errors: &mut Vec<FieldError>) -> Option<Role> {
    let role = Role::parse(raw.trim());
    if role.is_none() {
        errors.push(FieldError::new("role", "Role must be user or admin"));
    }
    role
}

fn parse_bool_flag(raw: &str, errors: &mut Vec<FieldError>) -> Option<bool> {
    match raw.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => {
            errors.push(FieldError::new("is_active", "is_active must be boolean"));
            None
        }
    }
}

/// Turn a PATCH body into a validated update.
fn build_update(req: UpdateUserRequest) -> Result<ProfileUpdate, ApiError> {
    let mut errors = Vec::new();
    let mut update = ProfileUpdate::default();

    if let Some(role) = req.role.as_deref() {
        update.role = parse_role(role, &mut errors);
    }
    match req.is_active {
        None | Some(Value::Null) => {}
        Some(Value::Bool(flag)) => update.is_active = Some(flag),
        Some(_) => errors.push(FieldError::new("is_active", "is_active must be boolean")),
    }
    if let Some(name) = req.full_name {
        let name = name.trim().to_string();
        let len = name.chars().count();
        if len == 0 || len > MAX_NAME_CHARS {
            errors.push(FieldError::new("full_name", "Name must be 1-100 characters"));
        } else {
            update.full_name = Some(name);
        }
    }
    ensure_valid(errors)?;

    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }
    Ok(update)
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<SharedState>,
    AppQuery(query): AppQuery<UserListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = Vec::new();
    let page = page_from(query.page.as_deref(), query.limit.as_deref(), &mut errors);
    let filter = UserFilter {
        search: non_blank(query.search),
        role: non_blank(query.role).and_then(|r| parse_role(&r, &mut errors)),
        is_active: non_blank(query.is_active).and_then(|a| parse_bool_flag(&a, &mut errors)),
    };
    ensure_valid(errors)?;

    let (users, total) = state.profiles.list(&filter, page).await?;
    Ok(ApiResponse::ok(json!({ "users": users, "pagination": page.with_total(total) })))
}

/// GET /api/admin/users/{id}
pub async fn get_user(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_uuid(&id, "Invalid user ID")?;
    let detail = state
        .profiles
        .detail(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(ApiResponse::ok(json!({ "user": detail })))
}

/// PATCH /api/admin/users/{id}
pub async fn update_user(
    State(state): State<SharedState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_uuid(&id, "Invalid user ID")?;
    let update = build_update(req)?;

    if id == admin.id {
        if update.role == Some(Role::User) {
            return Err(ApiError::BadRequest("You cannot demote yourself".to_string()));
        }
        if update.is_active == Some(false) {
            return Err(ApiError::BadRequest("You cannot deactivate yourself".to_string()));
        }
    }

    let profile = state
        .profiles
        .update(id, &update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(admin_id = %admin.id, user_id = %id, ?update, "user updated");
    Ok(ApiResponse::ok(json!({ "user": profile })))
}

/// DELETE /api/admin/users/{id}
pub async fn delete_user(
    State(state): State<SharedState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_uuid(&id, "Invalid user ID")?;
    if id == admin.id {
        return Err(ApiError::BadRequest("You cannot delete your own account".to_string()));
    }
    if !state.profiles.delete(id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    tracing::info!(admin_id = %admin.id, user_id = %id, "user deleted");
    Ok(ApiMessage::new("User deleted successfully"))
}
