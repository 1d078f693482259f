/*
 * Responsibility
 * - v1 の URL 構造と各 route の access policy を宣言する
 * - /health, /api/sessions/..., /private/... を RouteTable にまとめる
 * - Policy はここでだけ決める (handler 側では判断しない)
 */
use crate::api::router::{RouteBuilder, RouteTable};
use crate::services::auth::Policy;
use crate::state::AppState;

use crate::api::v1::handlers::{health::health, private, sessions};

pub fn routes(state: &AppState) -> RouteTable<AppState> {
    let system = RouteBuilder::new(state.policy.clone())
        .get("/health", Policy::Public, health)
        .build();

    let sessions = RouteBuilder::new(state.policy.clone())
        .prefix("/api/sessions")
        .post("/register", Policy::Public, sessions::register)
        .post("/login", Policy::Public, sessions::login)
        .post("/logout", Policy::Public, sessions::logout)
        .get("/current", Policy::Authenticated, sessions::current)
        .get("/whoami", Policy::Public, sessions::whoami)
        .build();

    let private = RouteBuilder::new(state.policy.clone())
        .prefix("/private")
        .get("/ping", Policy::Authenticated, private::ping)
        .get("/admin-ping", [Policy::Admin], private::admin_ping)
        .get(
            "/premium",
            [Policy::UserPremium, Policy::Admin],
            private::premium,
        )
        .build();

    system.merge(sessions).merge(private)
}
