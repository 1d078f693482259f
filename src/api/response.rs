//! Response contract shared by handlers and the pipeline stages.
//!
//! Two envelope shapes exist:
//! - success `{"status":"success","payload":T}`
//! - error   `{"status":"error","message":String}`
//!
//! A [`Reply`] is attached to every pipeline request. It records the first
//! envelope emitted; later attempts are ignored and the recorded envelope is
//! returned instead, so a request never produces two bodies.

use std::sync::{Arc, OnceLock};

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope<T> {
    Success { payload: T },
    Error { message: String },
}

impl<T> Envelope<T> {
    pub fn success(payload: T) -> Self {
        Self::Success { payload }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Response extension: this response is the envelope recorded by a [`Reply`].
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeSent;

#[derive(Debug, Clone)]
struct Emitted {
    status: StatusCode,
    body: serde_json::Value,
}

impl Emitted {
    fn to_response(&self) -> Response {
        let mut response = (self.status, Json(self.body.clone())).into_response();
        response.extensions_mut().insert(EnvelopeSent);
        response
    }
}

/// Per-request envelope writer (`send_success` / `send_error`).
///
/// Obtained in handlers as an extractor; inserted by the contract stage.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    emitted: Arc<OnceLock<Emitted>>,
}

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_success<T: Serialize>(&self, payload: T) -> Response {
        self.send_success_with(StatusCode::OK, payload)
    }

    pub fn send_success_with<T: Serialize>(&self, status: StatusCode, payload: T) -> Response {
        match serde_json::to_value(Envelope::success(payload)) {
            Ok(body) => self.emit(status, body),
            Err(e) => AppError::internal(e).into_response(),
        }
    }

    pub fn send_error(&self, message: impl Into<String>) -> Response {
        self.send_error_with(message, StatusCode::BAD_REQUEST)
    }

    pub fn send_error_with(&self, message: impl Into<String>, status: StatusCode) -> Response {
        let envelope = Envelope::<()>::error(message);
        match serde_json::to_value(envelope) {
            Ok(body) => self.emit(status, body),
            Err(e) => AppError::internal(e).into_response(),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.emitted.get().is_some()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.emitted.get().map(|e| e.status)
    }

    /// The envelope already emitted on this request, rebuilt as a response.
    pub fn sent_response(&self) -> Option<Response> {
        self.emitted.get().map(Emitted::to_response)
    }

    fn emit(&self, status: StatusCode, body: serde_json::Value) -> Response {
        if self.emitted.set(Emitted { status, body }).is_err() {
            tracing::warn!("envelope already sent for this request; ignoring the new one");
        }
        // `set` failing means a value is present; `get` cannot miss here.
        self.emitted
            .get()
            .map(Emitted::to_response)
            .unwrap_or_else(|| AppError::internal(anyhow::anyhow!("reply slot empty")).into_response())
    }
}

impl<S> FromRequestParts<S> for Reply
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Reply>().cloned().ok_or_else(|| {
            AppError::internal(anyhow::anyhow!(
                "Reply missing; route was not registered through RouteBuilder"
            ))
        })
    }
}

/// `Json<T>` whose rejections use the error envelope (400).
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| ApiJson(value))
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))
    }
}
