//! Stage a: attach a fresh [`Reply`] to the request so the policy stage and
//! the handler emit envelopes through the same per-request slot.

use axum::{body::Body, http::Request, middleware::Next, response::Response};

use crate::api::response::Reply;

pub async fn attach_reply(mut req: Request<Body>, next: Next) -> Response {
    req.extensions_mut().insert(Reply::new());
    next.run(req).await
}
