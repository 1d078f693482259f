/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - policy evaluator, token issuer, user store, cookie settings
 * - Clone 前提で持つ (内部は Arc/Clone cheap); nothing here is mutated per request
 */
use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::{Cookie, Key, SameSite};

use crate::services::auth::{PolicyEvaluator, TokenIssuer};
use crate::services::users::UserStore;

/// How the session cookie is written by the login flow.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
    pub max_age_seconds: u64,
}

impl SessionCookie {
    pub fn build(&self, token: String) -> Cookie<'static> {
        Cookie::build((self.name.clone(), token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .path("/")
            .max_age(time::Duration::seconds(
                i64::try_from(self.max_age_seconds).unwrap_or(i64::MAX),
            ))
            .build()
    }

    /// Expired, empty cookie with the session cookie's name and attributes.
    /// Sent on every logout, whether or not the request carried the cookie.
    pub fn removal(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build((self.name.clone(), ""))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .path("/")
            .build();
        cookie.make_removal();
        cookie
    }
}

#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<PolicyEvaluator>,
    pub issuer: Arc<TokenIssuer>,
    pub users: Arc<dyn UserStore>,
    pub session_cookie: SessionCookie,
    pub cookie_key: Key,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("AppState")
            .field("policy", &self.policy)
            .field("issuer", &self.issuer)
            .field("session_cookie", &self.session_cookie)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        policy: Arc<PolicyEvaluator>,
        issuer: Arc<TokenIssuer>,
        users: Arc<dyn UserStore>,
        session_cookie: SessionCookie,
        cookie_key: Key,
    ) -> Self {
        Self {
            policy,
            issuer,
            users,
            session_cookie,
            cookie_key,
        }
    }
}

/// Lets `MaybeUser` resolve a credential on routes the policy stage skipped.
impl FromRef<AppState> for Arc<PolicyEvaluator> {
    fn from_ref(state: &AppState) -> Self {
        state.policy.clone()
    }
}

/// Lets handlers take `SignedCookieJar` directly.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
