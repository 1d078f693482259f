/*
 * Responsibility
 * - Load settings from the environment (.env supported via dotenvy)
 * - Validate them up front (missing secrets in production fail startup)
 */
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-only-jwt-secret-change-me";
const DEV_COOKIE_SECRET: &str = "dev-only-cookie-secret-change-me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Cookie transport settings shared by the extractor and the login flow.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub secret: String,
    pub secure: bool,
}

#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub jwt_secret: String,
    pub jwt_expires_seconds: u64,
    pub jwt_leeway_seconds: u64,

    pub cookie: CookieConfig,

    pub admin_seed: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = parse_list(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default());

        let jwt_secret = secret_from_env("JWT_SECRET", DEV_JWT_SECRET, app_env)?;

        let jwt_expires_seconds = seconds_from_env("JWT_EXPIRES_SECONDS", 15 * 60)?;
        if jwt_expires_seconds == 0 {
            return Err(ConfigError::Invalid("JWT_EXPIRES_SECONDS"));
        }

        let jwt_leeway_seconds = seconds_from_env("JWT_LEEWAY_SECONDS", 0)?;

        let cookie = CookieConfig {
            name: std::env::var("COOKIE_NAME")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "currentUser".to_string()),
            secret: secret_from_env("COOKIE_SECRET", DEV_COOKIE_SECRET, app_env)?,
            secure: app_env.is_production(),
        };

        let admin_seed = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some(AdminSeed { email, password })
            }
            (Ok(_), Err(_)) => return Err(ConfigError::Missing("ADMIN_PASSWORD")),
            _ => None,
        };

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            jwt_secret,
            jwt_expires_seconds,
            jwt_leeway_seconds,
            cookie,
            admin_seed,
        })
    }
}

fn secret_from_env(
    key: &'static str,
    dev_default: &str,
    app_env: AppEnv,
) -> Result<String, ConfigError> {
    resolve_secret(key, std::env::var(key).ok(), dev_default, app_env)
}

fn resolve_secret(
    key: &'static str,
    raw: Option<String>,
    dev_default: &str,
    app_env: AppEnv,
) -> Result<String, ConfigError> {
    match raw {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ if app_env.is_production() => Err(ConfigError::Missing(key)),
        _ => {
            tracing::warn!(key, "secret not set; using development default");
            Ok(dev_default.to_string())
        }
    }
}

/// Unset or blank uses `default`; anything that is not a whole number of seconds is an error.
fn seconds_from_env(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    parse_seconds(key, std::env::var(key).ok(), default)
}

fn parse_seconds(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => v.parse::<u64>().map_err(|_| ConfigError::Invalid(key)),
    }
}

fn parse_list(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
