/*
 * Responsibility
 * - User lookup collaborator consumed by the login / register flow
 * - The policy pipeline never calls this; it only trusts verified tokens
 */
mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::services::auth::Role;

pub use memory::InMemoryUserStore;

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

/// Input for `UserStore::create`. The password is plaintext; the store hashes it.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("email already in use")]
    Conflict,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("user store backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserStoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, UserStoreError>;

    async fn verify_password(
        &self,
        record: &UserRecord,
        plaintext: &str,
    ) -> Result<bool, UserStoreError>;

    async fn create(&self, new_user: NewUser) -> Result<UserRecord, UserStoreError>;
}

/// Emails are compared trimmed and lowercase everywhere.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
