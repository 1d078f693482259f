/*
 * Responsibility
 * - Config読み込み → 依存生成 (AppState) → Router 組み立て
 * - App-wide middleware の適用 (security headers, CORS, HTTP)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::error;
use crate::middleware::{cors, http, security_headers};
use crate::services::auth::{build_policy_evaluator, build_token_issuer, cookie_key, Role};
use crate::services::users::{InMemoryUserStore, NewUser, UserStore, UserStoreError};
use crate::state::{AppState, SessionCookie};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,policy_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing (stderr can be hidden depending on how the process is launched).
        tracing::error!(?info, "panic");

        // Development: fail fast. Production: the handler guard answers 500 and the server keeps running.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

/// Process-level services, built once and shared read-only by every request.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let key = cookie_key(&config.cookie.secret);
    let policy = build_policy_evaluator(config, key.clone());
    let issuer = build_token_issuer(config);

    let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
    seed_admin(users.as_ref(), config).await?;

    let session_cookie = SessionCookie {
        name: config.cookie.name.clone(),
        secure: config.cookie.secure,
        max_age_seconds: config.jwt_expires_seconds,
    };

    Ok(AppState::new(policy, issuer, users, session_cookie, key))
}

async fn seed_admin(users: &dyn UserStore, config: &Config) -> Result<()> {
    let Some(seed) = &config.admin_seed else {
        return Ok(());
    };

    let created = users
        .create(NewUser {
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            age: 0,
            email: seed.email.clone(),
            password: seed.password.clone(),
            role: Role::Admin,
        })
        .await;

    match created {
        Ok(record) => tracing::info!(user_id = %record.id, "admin account seeded"),
        Err(UserStoreError::Conflict) => tracing::debug!("admin account already present"),
        Err(e) => return Err(anyhow::anyhow!(e).context("failed to seed admin account")),
    }
    Ok(())
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let table = api::v1::routes(&state);

    for spec in table.unrestricted() {
        tracing::warn!(method = %spec.method, path = %spec.path, "route has no access policy");
    }

    let router = table
        .into_router()
        .fallback(error::route_not_found);
    let router = router.with_state(state);

    let router = security_headers::apply(router);
    let router = cors::apply(router, config);
    http::apply(router)
}
