//! HTTP server module.
//!
//! Exposes the task repository as a JSON REST API using axum.

mod api;

pub use api::{ApiState, ServerHandle, build_router, start_server};
