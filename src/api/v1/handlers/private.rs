/*
 * Responsibility
 * - /private/{ping,admin-ping,premium} の保護されたエンドポイント
 * - Access is decided entirely by the policies declared in routes.rs
 */
use axum::response::Response;
use serde_json::json;

use crate::{api::response::Reply, api::v1::extractors::CurrentUser};

/// AUTHENTICATED: any valid token.
pub async fn ping(reply: Reply, CurrentUser(identity): CurrentUser) -> Response {
    reply.send_success(json!({
        "message": "pong (private)",
        "user": identity,
    }))
}

/// ADMIN only.
pub async fn admin_ping(reply: Reply) -> Response {
    reply.send_success(json!({ "message": "pong (admin)" }))
}

/// USER_PREMIUM or ADMIN (listed explicitly; roles do not inherit).
pub async fn premium(reply: Reply, CurrentUser(identity): CurrentUser) -> Response {
    reply.send_success(json!({
        "message": "premium content",
        "role": identity.role,
    }))
}
