/*
 * Responsibility
 * - /api/sessions: register, login (mints the token + sets the cookie), logout,
 *   current (AUTHENTICATED), whoami (PUBLIC, caller resolved on demand)
 * - The only handlers that talk to the UserStore
 */
use axum::{extract::State, http::StatusCode, response::Response};
use axum_extra::extract::cookie::{CookieJar, SignedCookieJar};

use crate::{
    api::response::{ApiJson, Reply},
    api::v1::dto::sessions::{
        LoginRequest, LogoutResponse, RegisterRequest, RegisterResponse, TokenResponse,
        WhoAmIResponse,
    },
    api::v1::extractors::{CurrentUser, MaybeUser},
    error::AppError,
    services::auth::Role,
    services::users::{NewUser, normalize_email},
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "invalid credentials";

pub async fn register(
    State(state): State<AppState>,
    reply: Reply,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Response, AppError> {
    let input = req.validate().map_err(AppError::BadRequest)?;

    // Role is never taken from the request body.
    let record = state
        .users
        .create(NewUser {
            first_name: input.first_name,
            last_name: input.last_name,
            age: input.age,
            email: normalize_email(&input.email),
            password: input.password,
            role: Role::User,
        })
        .await?;

    tracing::info!(user_id = %record.id, "user registered");

    Ok(reply.send_success_with(StatusCode::CREATED, RegisterResponse { id: record.id }))
}

pub async fn login(
    State(state): State<AppState>,
    reply: Reply,
    jar: SignedCookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<(SignedCookieJar, Response), AppError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request("email and password are required"));
    }

    let email = normalize_email(&req.email);
    let Some(user) = state.users.find_by_email(&email).await? else {
        tracing::debug!("login for unknown email");
        return Ok((jar, reply.send_error_with(INVALID_CREDENTIALS, StatusCode::UNAUTHORIZED)));
    };

    if !state.users.verify_password(&user, &req.password).await? {
        tracing::debug!(user_id = %user.id, "login with wrong password");
        return Ok((jar, reply.send_error_with(INVALID_CREDENTIALS, StatusCode::UNAUTHORIZED)));
    }

    let issued = state.issuer.issue(&user)?;
    let jar = jar.add(state.session_cookie.build(issued.token.clone()));

    tracing::info!(user_id = %user.id, "login succeeded");

    Ok((
        jar,
        reply.send_success(TokenResponse {
            access_token: issued.token,
            token_type: "Bearer",
            expires_in: issued.expires_in,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    reply: Reply,
    jar: CookieJar,
) -> (CookieJar, Response) {
    // Unsigned: an expired empty cookie carries nothing worth signing.
    let jar = jar.add(state.session_cookie.removal());
    (
        jar,
        reply.send_success(LogoutResponse {
            ok: true,
            message: "token cleared",
        }),
    )
}

pub async fn current(reply: Reply, CurrentUser(identity): CurrentUser) -> Response {
    reply.send_success(identity)
}

pub async fn whoami(reply: Reply, MaybeUser(identity): MaybeUser) -> Response {
    reply.send_success(WhoAmIResponse {
        authenticated: identity.is_some(),
        user: identity,
    })
}
