use axum::{http::StatusCode, response::IntoResponse};
use tracing::error;

use crate::metrics;

// GET /metrics on the operator listener
pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}
