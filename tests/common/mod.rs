//! Shared fixtures for the HTTP-level tests.
//!
//! - `TestApp`: the full application router built from a fixed test `Config`
//! - token helpers signing HS256 tokens with the test secret
//! - request builders and a JSON-decoding response wrapper

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, SignedCookieJar};
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::Value;
use tower::ServiceExt;

use policy_gate::{
    app,
    config::{AdminSeed, AppEnv, Config, CookieConfig},
    services::auth::Claims,
    state::AppState,
};

pub const JWT_SECRET: &str = "test-jwt-secret-for-integration";
pub const COOKIE_NAME: &str = "currentUser";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub fn test_config() -> Config {
    Config {
        addr: "127.0.0.1:0".parse().unwrap(),
        app_env: AppEnv::Development,
        cors_allowed_origins: Vec::new(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expires_seconds: 900,
        jwt_leeway_seconds: 0,
        cookie: CookieConfig {
            name: COOKIE_NAME.to_string(),
            secret: "test-cookie-secret".to_string(),
            secure: false,
        },
        admin_seed: Some(AdminSeed {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        }),
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub config: Config,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = test_config();
        let state = app::build_state(&config).await.unwrap();
        let router = app::build_router(state.clone(), &config);
        Self {
            router,
            state,
            config,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        TestResponse::read(self.router.clone().oneshot(req).await.unwrap()).await
    }

    /// `name=value` as a browser would send back the signed session cookie.
    pub fn signed_cookie(&self, token: &str) -> String {
        let jar = SignedCookieJar::new(self.state.cookie_key.clone())
            .add(Cookie::new(COOKIE_NAME, token.to_string()));
        let response = (jar, ()).into_response();
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub async fn read(response: axum::response::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }

    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Token with the given role claim, expiring `exp_offset` seconds from now.
pub fn token_with(secret: &str, role: Option<&str>, exp_offset: i64) -> String {
    let claims = Claims {
        sub: Some("7f1b7a0e-0000-4000-8000-000000000001".to_string()),
        id: None,
        email: Some("someone@example.com".to_string()),
        role: role.map(str::to_string),
        iat: Some(now() as u64),
        exp: (now() + exp_offset) as u64,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn token(role: &str) -> String {
    token_with(JWT_SECRET, Some(role), 600)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .unwrap()
}

pub fn get_with(path: &str, name: header::HeaderName, value: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .header(name, value)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
