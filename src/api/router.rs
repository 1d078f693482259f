//! Declarative route registration with a fixed per-route pipeline.
//!
//! ```ignore
//! let table = RouteBuilder::new(evaluator)
//!     .prefix("/private")
//!     .get("/ping", Policy::Authenticated, ping)
//!     .get("/admin-ping", [Policy::Admin], admin_ping)
//!     .build();
//! let router: Router<AppState> = table.into_router();
//! ```
//!
//! Every registration is wrapped, outermost first, in:
//! 1. `contract::attach_reply`: fresh `Reply` in request extensions
//! 2. `auth::access::enforce`: the route's `PolicySet` (skipped when empty)
//! 3. `guard::guard_handler` + `CatchPanicLayer`: failure recovery
//!
//! An empty policy set means "no restriction". Routes should say
//! `Policy::Public` explicitly; every unrestricted registration is logged as a
//! warning and listed by [`RouteTable::unrestricted`].

use std::sync::Arc;

use axum::{
    Router,
    handler::Handler,
    http::Method,
    middleware,
    routing::{MethodFilter, on},
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::error;
use crate::middleware::auth::access::{self, PolicyStage};
use crate::middleware::{contract, guard};
use crate::services::auth::{PolicyEvaluator, PolicySet};

/// One registered route, kept for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub method: Method,
    pub path: String,
    pub policies: PolicySet,
}

pub struct RouteBuilder<S> {
    evaluator: Arc<PolicyEvaluator>,
    prefix: String,
    specs: Vec<RouteSpec>,
    router: Router<S>,
}

impl<S> RouteBuilder<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(evaluator: Arc<PolicyEvaluator>) -> Self {
        Self {
            evaluator,
            prefix: String::new(),
            specs: Vec::new(),
            router: Router::new(),
        }
    }

    /// Path prefix for routes registered after this call.
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    pub fn get<H, T>(self, path: &str, policies: impl Into<PolicySet>, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.register(Method::GET, MethodFilter::GET, path, policies.into(), handler)
    }

    pub fn post<H, T>(self, path: &str, policies: impl Into<PolicySet>, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.register(Method::POST, MethodFilter::POST, path, policies.into(), handler)
    }

    pub fn put<H, T>(self, path: &str, policies: impl Into<PolicySet>, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.register(Method::PUT, MethodFilter::PUT, path, policies.into(), handler)
    }

    pub fn patch<H, T>(self, path: &str, policies: impl Into<PolicySet>, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.register(Method::PATCH, MethodFilter::PATCH, path, policies.into(), handler)
    }

    pub fn delete<H, T>(self, path: &str, policies: impl Into<PolicySet>, handler: H) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        self.register(Method::DELETE, MethodFilter::DELETE, path, policies.into(), handler)
    }

    /// Register for an arbitrary method.
    ///
    /// # Panics
    ///
    /// If `method` has no axum `MethodFilter` (e.g. `CONNECT`), the same way
    /// `Router::route` panics on an invalid path.
    pub fn route<H, T>(
        self,
        method: Method,
        path: &str,
        policies: impl Into<PolicySet>,
        handler: H,
    ) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        let filter = match MethodFilter::try_from(method.clone()) {
            Ok(filter) => filter,
            Err(_) => panic!("cannot register {path}: unsupported method {method}"),
        };
        self.register(method, filter, path, policies.into(), handler)
    }

    pub fn build(self) -> RouteTable<S> {
        RouteTable {
            specs: self.specs,
            router: self.router,
        }
    }

    fn register<H, T>(
        mut self,
        method: Method,
        filter: MethodFilter,
        path: &str,
        policies: PolicySet,
        handler: H,
    ) -> Self
    where
        H: Handler<T, S>,
        T: 'static,
    {
        let full_path = join_path(&self.prefix, path);

        let guarded = handler
            .layer(CatchPanicLayer::custom(error::panic_response))
            .layer(middleware::from_fn(guard::guard_handler));

        let method_router = if policies.is_empty() {
            tracing::warn!(
                %method,
                path = %full_path,
                "route registered without policies; it is open to everyone (use Policy::Public to make that explicit)"
            );
            on(filter, guarded.layer(middleware::from_fn(contract::attach_reply)))
        } else {
            let stage = PolicyStage::new(self.evaluator.clone(), policies.clone());
            on(
                filter,
                guarded
                    .layer(middleware::from_fn_with_state(stage, access::enforce))
                    .layer(middleware::from_fn(contract::attach_reply)),
            )
        };

        tracing::debug!(%method, path = %full_path, policies = %policies, "route registered");

        self.router = self.router.route(&full_path, method_router);
        self.specs.push(RouteSpec {
            method,
            path: full_path,
            policies,
        });
        self
    }
}

/// Immutable result of [`RouteBuilder::build`], consumed by the HTTP layer at startup.
pub struct RouteTable<S> {
    specs: Vec<RouteSpec>,
    router: Router<S>,
}

impl<S> RouteTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn routes(&self) -> &[RouteSpec] {
        &self.specs
    }

    pub fn unrestricted(&self) -> impl Iterator<Item = &RouteSpec> {
        self.specs.iter().filter(|s| s.policies.is_empty())
    }

    pub fn find(&self, method: &Method, path: &str) -> Option<&RouteSpec> {
        self.specs
            .iter()
            .find(|s| &s.method == method && s.path == path)
    }

    pub fn merge(mut self, other: RouteTable<S>) -> Self {
        self.specs.extend(other.specs);
        self.router = self.router.merge(other.router);
        self
    }

    pub fn into_router(self) -> Router<S> {
        self.router
    }
}

fn join_path(prefix: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    match (prefix.is_empty(), path.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{path}"),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{path}"),
    }
}
