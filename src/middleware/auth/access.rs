//! Policy stage: route に宣言された policy を評価し、Identity を extensions に入れる
//!
//! - Denied: the error envelope goes out through the request's `Reply` and the
//!   chain stops here (the handler never runs)
//! - Allowed(Some(identity)): identity is stored for `CurrentUser` / `MaybeUser`
//! - Allowed(None): PUBLIC route, nothing is stored

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::api::response::Reply;
use crate::services::auth::{Outcome, PolicyEvaluator, PolicySet};

/// Per-route state for the policy stage.
#[derive(Clone, Debug)]
pub struct PolicyStage {
    evaluator: Arc<PolicyEvaluator>,
    policies: PolicySet,
}

impl PolicyStage {
    pub fn new(evaluator: Arc<PolicyEvaluator>, policies: PolicySet) -> Self {
        Self {
            evaluator,
            policies,
        }
    }
}

pub async fn enforce(
    State(stage): State<PolicyStage>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match stage.evaluator.evaluate(&stage.policies, req.headers()) {
        Outcome::Allowed(identity) => {
            if let Some(identity) = identity {
                // CurrentUser / MaybeUser はここで入れた Identity を読む
                req.extensions_mut().insert(identity);
            }
            next.run(req).await
        }
        Outcome::Denied(denied) => {
            tracing::debug!(
                method = %req.method(),
                path = %req.uri().path(),
                required = %stage.policies,
                reason = %denied,
                "request denied by policy"
            );
            // Stage a always runs first; a fresh Reply only covers misuse outside the pipeline.
            let reply = req.extensions().get::<Reply>().cloned().unwrap_or_default();
            reply.send_error_with(denied.message(), denied.status())
        }
    }
}
