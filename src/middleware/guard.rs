//! Stage c: guarded handler invocation.
//!
//! Sits between the policy stage and the handler (with `CatchPanicLayer`
//! directly underneath it, so panics arrive here as failure responses).
//!
//! | handler result                      | envelope already sent | response                 |
//! |-------------------------------------|-----------------------|--------------------------|
//! | ok                                  | no                    | handler's response       |
//! | ok, but not the sent envelope       | yes                   | the sent envelope        |
//! | internal failure / panic            | no                    | generic 500 envelope     |
//! | internal failure / panic            | yes                   | the sent envelope, failure reported centrally |

use axum::{body::Body, http::Request, middleware::Next, response::Response};

use crate::api::response::{EnvelopeSent, Reply};
use crate::error::{self, HandlerFailure};

pub async fn guard_handler(req: Request<Body>, next: Next) -> Response {
    let reply = req.extensions().get::<Reply>().cloned();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let failure = response.extensions().get::<HandlerFailure>().cloned();
    let sent = reply.as_ref().and_then(Reply::sent_response);

    match (sent, failure) {
        (Some(sent), Some(failure)) => {
            error::report_failure(&failure, method.as_str(), &path, true);
            sent
        }
        (None, Some(failure)) => {
            error::report_failure(&failure, method.as_str(), &path, false);
            response
        }
        (Some(sent), None) if response.extensions().get::<EnvelopeSent>().is_none() => {
            tracing::warn!(
                method = %method,
                path = %path,
                "handler returned a second response after sending an envelope; keeping the first"
            );
            sent
        }
        _ => response,
    }
}
