/*
 * Responsibility
 * - /api/sessions の request/response DTO
 * - validate() は形式チェックのみ (existence/uniqueness は store 側)
 */
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::auth::Identity;

/// All fields optional so a missing one is reported by `validate`, not as a
/// deserialization error.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub age: Option<u32>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Register input after validation.
#[derive(Debug)]
pub struct ValidRegistration {
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<ValidRegistration, String> {
        fn present(v: Option<String>) -> Option<String> {
            v.filter(|s| !s.trim().is_empty())
        }

        let first_name = present(self.first_name);
        let last_name = present(self.last_name);
        let email = present(self.email);
        let password = present(self.password);

        let mut missing = Vec::new();
        if first_name.is_none() {
            missing.push("first_name");
        }
        if last_name.is_none() {
            missing.push("last_name");
        }
        if self.age.is_none() {
            missing.push("age");
        }
        if email.is_none() {
            missing.push("email");
        }
        if password.is_none() {
            missing.push("password");
        }

        match (first_name, last_name, self.age, email, password) {
            (Some(first_name), Some(last_name), Some(age), Some(email), Some(password)) => {
                if !email.contains('@') {
                    return Err("email is invalid".to_string());
                }
                Ok(ValidRegistration {
                    first_name: first_name.trim().to_string(),
                    last_name: last_name.trim().to_string(),
                    age,
                    email,
                    password,
                })
            }
            _ => Err(format!("missing fields: {}", missing.join(", "))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always "Bearer"
    pub token_type: &'static str,
    /// Seconds until expiry.
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub ok: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub authenticated: bool,
    pub user: Option<Identity>,
}
