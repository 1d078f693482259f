use jsonwebtoken::{Algorithm, EncodingKey, Header};
use tracing::error;

use super::token::Claims;
use crate::error::AppError;
use crate::services::users::UserRecord;

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
}

/// Mints session tokens for the login flow (HS256, same secret the verifier uses).
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    ttl_seconds: u64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Role is written lowercase, the way it is stored; verification upper-cases it.
    pub fn issue(&self, user: &UserRecord) -> Result<IssuedToken, AppError> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;

        let claims = Claims {
            sub: Some(user.id.to_string()),
            id: None,
            email: Some(user.email.clone()),
            role: Some(user.role.as_str().to_ascii_lowercase()),
            iat: Some(now),
            exp: now + self.ttl_seconds,
        };

        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        let token = jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign JWT");
            AppError::internal(e)
        })?;

        Ok(IssuedToken {
            token,
            expires_in: self.ttl_seconds,
        })
    }
}
