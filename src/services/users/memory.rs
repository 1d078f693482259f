use std::collections::HashMap;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{NewUser, UserRecord, UserStore, UserStoreError, normalize_email};

/// Process-local store keyed by normalized email. Passwords are Argon2id PHC strings.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserStoreError> {
        let users = self.users.read().await;
        Ok(users.get(&normalize_email(email)).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, UserStoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.id == id).cloned())
    }

    async fn verify_password(
        &self,
        record: &UserRecord,
        plaintext: &str,
    ) -> Result<bool, UserStoreError> {
        let hash = record.password_hash.clone();
        let plaintext = plaintext.to_string();

        // Argon2 is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || verify_hash(&hash, &plaintext))
            .await
            .map_err(|e| UserStoreError::Backend(e.to_string()))?
    }

    async fn create(&self, new_user: NewUser) -> Result<UserRecord, UserStoreError> {
        let email = normalize_email(&new_user.email);
        if self.users.read().await.contains_key(&email) {
            return Err(UserStoreError::Conflict);
        }

        let password = new_user.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| UserStoreError::Backend(e.to_string()))??;

        let record = UserRecord {
            id: Uuid::new_v4(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            age: new_user.age,
            email: email.clone(),
            role: new_user.role,
            password_hash,
        };

        // Re-check under the write lock: another request may have won the race while hashing.
        let mut users = self.users.write().await;
        if users.contains_key(&email) {
            return Err(UserStoreError::Conflict);
        }
        users.insert(email, record.clone());

        Ok(record)
    }
}

fn hash_password(password: &str) -> Result<String, UserStoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| UserStoreError::Hash(e.to_string()))
}

fn verify_hash(hash: &str, password: &str) -> Result<bool, UserStoreError> {
    let parsed = PasswordHash::new(hash).map_err(|e| UserStoreError::Hash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(UserStoreError::Hash(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Ana".to_string(),
            last_name: "Diaz".to_string(),
            age: 30,
            email: email.to_string(),
            password: "s3cret-pass".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn create_then_find_by_email_and_id() {
        let store = InMemoryUserStore::new();
        let created = store.create(new_user("  Ana@Example.com ")).await.unwrap();

        assert_eq!(created.email, "ana@example.com");
        assert!(created.password_hash.starts_with("$argon2id$"));

        let by_email = store.find_by_email("ANA@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        let by_id = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "ana@example.com");

        assert!(store.find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let store = InMemoryUserStore::new();
        store.create(new_user("ana@example.com")).await.unwrap();

        let err = store.create(new_user("ANA@example.com")).await.unwrap_err();
        assert!(matches!(err, UserStoreError::Conflict));
    }

    #[tokio::test]
    async fn verify_password_matches_only_the_original() {
        let store = InMemoryUserStore::new();
        let user = store.create(new_user("ana@example.com")).await.unwrap();

        assert!(store.verify_password(&user, "s3cret-pass").await.unwrap());
        assert!(!store.verify_password(&user, "wrong").await.unwrap());
    }
}
