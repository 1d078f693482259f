//! Policy-gated HTTP pipeline: bearer credential extraction, verification,
//! identity normalization and per-route access policies on top of axum.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
