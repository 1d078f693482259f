/*
 * Responsibility
 * - GET /health (liveness; plain JSON, outside the envelope contract)
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"ok": true})))
}
