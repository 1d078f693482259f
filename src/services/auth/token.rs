use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims carried by a session token.
///
/// Two historical shapes exist for the subject: `sub` (current) and `id`
/// (older tokens). Both are kept here and resolved once by
/// `identity::normalize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    pub exp: u64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Verifies a bearer token and decodes its claims.
///
/// Deterministic and CPU-bound; callers never retry.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Claims, TokenError>;
}

/// HS256 verifier keyed by the process-wide JWT secret.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtVerifier {
    pub fn new(secret: &str, leeway_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_seconds;
        // Session tokens carry no audience.
        validation.validate_aud = false;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};

    const SECRET: &str = "unit-test-secret";

    fn sign(claims: &Claims, secret: &str) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encode")
    }

    fn claims_expiring_in(seconds: i64) -> Claims {
        Claims {
            sub: Some("u-1".to_string()),
            id: None,
            email: Some("ana@example.com".to_string()),
            role: Some("user".to_string()),
            iat: Some(chrono::Utc::now().timestamp() as u64),
            exp: (chrono::Utc::now().timestamp() + seconds) as u64,
        }
    }

    #[test]
    fn verifies_token_signed_with_same_secret() {
        let claims = claims_expiring_in(600);
        let token = sign(&claims, SECRET);

        let decoded = JwtVerifier::new(SECRET, 0).verify(&token).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn rejects_foreign_signature_as_invalid() {
        let token = sign(&claims_expiring_in(600), "some-other-secret");

        let err = JwtVerifier::new(SECRET, 0).verify(&token).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn rejects_expired_token_as_expired() {
        let token = sign(&claims_expiring_in(-3600), SECRET);

        let err = JwtVerifier::new(SECRET, 0).verify(&token).unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[test]
    fn leeway_tolerates_small_clock_skew() {
        let token = sign(&claims_expiring_in(-5), SECRET);

        assert!(JwtVerifier::new(SECRET, 60).verify(&token).is_ok());
    }

    #[test]
    fn rejects_garbage() {
        let verifier = JwtVerifier::new(SECRET, 0);
        assert!(matches!(verifier.verify("not-a-jwt"), Err(TokenError::Invalid(_))));
        assert!(matches!(verifier.verify(""), Err(TokenError::Invalid(_))));
    }
}
