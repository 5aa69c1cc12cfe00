//! Password hashing, access tokens and the request guards built on them.

pub mod accounts;
pub mod middleware;
pub mod password;
pub mod token;

pub use accounts::{Account, AccountSource};
pub use middleware::{require_admin, require_auth, AuthUser};
pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenService};

use thiserror::Error;
use tutor_common::ApiError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    Expired,
    #[error("User not found")]
    UnknownAccount,
    #[error("Account is deactivated")]
    Inactive,
    #[error("Credential processing failed: {0}")]
    Hash(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Hash(_) => ApiError::internal("Authentication failed", err),
            AuthError::Inactive => ApiError::Forbidden(err.to_string()),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_account_state_statuses() {
        assert_eq!(ApiError::from(AuthError::UnknownAccount).status(), StatusCode::UNAUTHORIZED);
        let inactive = ApiError::from(AuthError::Inactive);
        assert_eq!(inactive.status(), StatusCode::FORBIDDEN);
        assert_eq!(inactive.to_string(), "Account is deactivated");
    }
}
