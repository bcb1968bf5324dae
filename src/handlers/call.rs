use axum::{Json, extract::{ConnectInfo, State}};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use crate::metrics::{QUOTA_CHECKS, QUOTA_CHECK_LATENCY};
use crate::models::CallResponse;
use crate::state::AppState;

// Identity is the caller's IP as seen on the socket; headers are never trusted
fn client_identity(addr: &SocketAddr) -> String {
    addr.ip().to_string()
}

// POST /api/call - one call per user action, body ignored
pub async fn call_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Json<CallResponse> {
    QUOTA_CHECKS.inc();
    let start_time = Instant::now();

    let identity = client_identity(&addr);
    let decision = state.quota.check_and_consume(&identity);

    QUOTA_CHECK_LATENCY.observe(start_time.elapsed().as_secs_f64());

    if decision.allowed {
        info!(%identity, count = decision.count_after, "quota call allowed");
        Json(CallResponse::allowed(decision.count_after))
    } else {
        info!(%identity, count = decision.count_after, limit = state.quota.limit(), "quota call denied");
        Json(CallResponse::denied(state.quota.limit()))
    }
}
