use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Gauge, Histogram, TextEncoder, register_counter, register_gauge,
    register_histogram,
};

lazy_static! {
    pub static ref QUOTA_CHECKS: Counter =
        register_counter!("quota_checks_total", "Total number of quota checks").unwrap();
    pub static ref QUOTA_ALLOWED: Counter =
        register_counter!("quota_allowed_total", "Checks that consumed a unit of quota").unwrap();
    pub static ref QUOTA_DENIED: Counter =
        register_counter!("quota_denied_total", "Checks denied because the daily limit was reached").unwrap();
    pub static ref QUOTA_WINDOW_RESETS: Counter =
        register_counter!("quota_window_resets_total", "Client windows reset on a new day").unwrap();
    pub static ref QUOTA_TRACKED_CLIENTS: Gauge =
        register_gauge!("quota_tracked_clients", "Distinct client identities seen since startup").unwrap();
    pub static ref QUOTA_CHECK_LATENCY: Histogram = register_histogram!(
        "quota_check_latency_seconds",
        "Quota check latency in seconds"
    )
    .unwrap();
}

// Render the default registry in the Prometheus text format
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
