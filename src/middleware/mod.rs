/*
 * Responsibility
 * - Route pipeline stages: contract (a) → auth::access (b) → guard (c)
 * - App-wide layers: cors, http, security_headers
 */
pub mod auth;
pub mod contract;
pub mod cors;
pub mod guard;
pub mod http;
pub mod security_headers;
