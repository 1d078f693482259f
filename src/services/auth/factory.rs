/// Factory: build the auth services from application `Config`.
use std::sync::Arc;

use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::config::Config;
use crate::services::auth::{CredentialExtractor, JwtVerifier, PolicyEvaluator, TokenIssuer};

/// Cookie signing key derived from an arbitrary-length secret.
///
/// `Key::from` needs 64 bytes of material; SHA-512 of the secret gives exactly that.
pub fn cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

pub fn build_policy_evaluator(config: &Config, key: Key) -> Arc<PolicyEvaluator> {
    let verifier = Arc::new(JwtVerifier::new(&config.jwt_secret, config.jwt_leeway_seconds));
    let extractor = CredentialExtractor::new(config.cookie.name.clone(), key);

    Arc::new(PolicyEvaluator::new(extractor, verifier))
}

pub fn build_token_issuer(config: &Config) -> Arc<TokenIssuer> {
    Arc::new(TokenIssuer::new(&config.jwt_secret, config.jwt_expires_seconds))
}
