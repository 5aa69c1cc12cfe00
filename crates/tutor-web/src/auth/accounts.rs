//! Account lookup behind the auth guard.
//!
//! Every authenticated request re-reads the account, so a deactivation,
//! demotion or deletion takes effect before the token expires.

use async_trait::async_trait;
use tutor_db::{DbError, ProfileRepository};
use uuid::Uuid;

/// The fields the guard needs from a stored account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub email: String,
    pub role: String,
    pub is_active: bool,
}

#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, DbError>;
}

#[async_trait]
impl AccountSource for ProfileRepository {
    async fn find_account(&self, id: Uuid) -> Result<Option<Account>, DbError> {
        Ok(self.find_by_id(id).await?.map(|p| Account {
            email: p.email,
            role: p.role,
            is_active: p.is_active,
        }))
    }
}
