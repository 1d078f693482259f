/*
 * Responsibility
 * - AppError: the error type handlers return
 * - IntoResponse: every error becomes the `{status:"error", message}` envelope
 * - Centralized failure reporting (internal errors, panics, post-send failures)
 */
use std::any::Any;
use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::response::Envelope;
use crate::services::auth::AccessDenied;
use crate::services::users::UserStoreError;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{resource} not found")]
    NotFound { resource: &'static str },
    #[error("{0}")]
    Conflict(String),
    /// Unexpected failure. Detail is logged, never sent to the client.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            AppError::Internal(err) => {
                let mut response =
                    (status, Json(Envelope::<()>::error(INTERNAL_ERROR_MESSAGE))).into_response();
                // Picked up by the guard stage, which decides how to report it.
                response
                    .extensions_mut()
                    .insert(HandlerFailure::new(err, false));
                response
            }
            other => (status, Json(Envelope::<()>::error(other.to_string()))).into_response(),
        }
    }
}

impl From<AccessDenied> for AppError {
    fn from(denied: AccessDenied) -> Self {
        match denied.status() {
            StatusCode::UNAUTHORIZED => AppError::Unauthorized(denied.message()),
            _ => AppError::Forbidden(denied.message()),
        }
    }
}

impl From<UserStoreError> for AppError {
    fn from(e: UserStoreError) -> Self {
        match e {
            UserStoreError::Conflict => AppError::Conflict(e.to_string()),
            UserStoreError::Hash(_) | UserStoreError::Backend(_) => AppError::Internal(e.into()),
        }
    }
}

/// Response extension marking a response produced by a failed handler.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    error: Arc<anyhow::Error>,
    panicked: bool,
}

impl HandlerFailure {
    pub fn new(error: anyhow::Error, panicked: bool) -> Self {
        Self {
            error: Arc::new(error),
            panicked,
        }
    }

    pub fn panicked(&self) -> bool {
        self.panicked
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }
}

/// Centralized handler for failures caught around route handlers.
///
/// When a response was already sent the failure cannot change what the client
/// sees, so it is only reported here.
pub fn report_failure(failure: &HandlerFailure, method: &str, path: &str, response_sent: bool) {
    if response_sent {
        tracing::error!(
            method,
            path,
            panicked = failure.panicked(),
            error = ?failure.error(),
            "handler failed after the response was sent; keeping the sent response"
        );
    } else {
        tracing::error!(
            method,
            path,
            panicked = failure.panicked(),
            error = ?failure.error(),
            "handler failed"
        );
    }
}

/// `CatchPanicLayer` hook: a panicking handler becomes an internal failure.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(Envelope::<()>::error(INTERNAL_ERROR_MESSAGE)),
    )
        .into_response();
    response.extensions_mut().insert(HandlerFailure::new(
        anyhow::anyhow!("handler panicked: {detail}"),
        true,
    ));
    response
}

/// Fallback for unmatched paths.
pub async fn route_not_found() -> AppError {
    AppError::not_found("route")
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn error_status_codes_and_envelope() {
        let cases: Vec<(AppError, StatusCode, &str)> = vec![
            (AppError::bad_request("missing email"), StatusCode::BAD_REQUEST, "missing email"),
            (
                AppError::Unauthorized("credential required".into()),
                StatusCode::UNAUTHORIZED,
                "credential required",
            ),
            (AppError::Forbidden("access denied".into()), StatusCode::FORBIDDEN, "access denied"),
            (AppError::not_found("user"), StatusCode::NOT_FOUND, "user not found"),
            (AppError::Conflict("email already in use".into()), StatusCode::CONFLICT, "email already in use"),
        ];

        for (error, status, message) in cases {
            let response = error.into_response();
            assert_eq!(response.status(), status);
            assert!(response.extensions().get::<HandlerFailure>().is_none());
            let body = body_json(response).await;
            assert_eq!(body, serde_json::json!({"status": "error", "message": message}));
        }
    }

    #[tokio::test]
    async fn internal_error_hides_detail_and_marks_failure() {
        let response = AppError::internal(anyhow::anyhow!("db password is hunter2")).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let failure = response.extensions().get::<HandlerFailure>().cloned().unwrap();
        assert!(!failure.panicked());

        let body = body_json(response).await;
        assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);
        assert!(!body.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn panic_response_is_generic_500() {
        let response = panic_response(Box::new("boom"));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let failure = response.extensions().get::<HandlerFailure>().cloned().unwrap();
        assert!(failure.panicked());
        assert!(failure.error().to_string().contains("boom"));
    }

    #[test]
    fn access_denied_maps_to_matching_status() {
        assert_eq!(
            AppError::from(AccessDenied::MissingCredential).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(AccessDenied::InsufficientRole).status(),
            StatusCode::FORBIDDEN
        );
    }
}
