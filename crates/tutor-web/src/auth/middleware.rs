//! Bearer-token guards applied with `route_layer`.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::Response;
use tutor_common::ApiError;
use tutor_db::Role;
use uuid::Uuid;

use super::AuthError;
use crate::state::SharedState;

/// Identity attached to the request by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin.as_str()
    }
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_auth(
    State(state): State<SharedState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&req).ok_or(AuthError::MissingToken)?;
    let claims = state.tokens.verify(token)?;
    let account = state
        .accounts
        .find_account(claims.sub)
        .await?
        .ok_or(AuthError::UnknownAccount)?;
    if !account.is_active {
        tracing::info!(user_id = %claims.sub, "deactivated account rejected");
        return Err(AuthError::Inactive.into());
    }
    req.extensions_mut().insert(AuthUser {
        id: claims.sub,
        email: account.email,
        role: account.role,
    });
    Ok(next.run(req).await)
}

/// Must run after `require_auth`.
pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let caller = req.extensions().get::<AuthUser>().map(|u| (u.id, u.is_admin()));
    match caller {
        Some((_, true)) => Ok(next.run(req).await),
        Some((user_id, false)) => {
            tracing::warn!(%user_id, path = %req.uri().path(), "non-admin denied");
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
        None => Err(AuthError::MissingToken.into()),
    }
}
