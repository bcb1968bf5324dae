//! Per-client daily call quota served over HTTP.
//!
//! A single `POST /api/call` endpoint answers whether the calling address may
//! run one more expensive action today. Counters live in memory for the
//! lifetime of the process and reset at midnight in one fixed timezone.

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod quota;
pub mod state;

use crate::handlers::{call_handler, metrics_handler};
use crate::state::AppState;

// Quota listener: exactly one route
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/call", post(call_handler))
        .with_state(state)
}

// Operator listener, bound separately when --metrics-port is set
pub fn metrics_router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}
