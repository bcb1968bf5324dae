mod call;
mod metrics;

pub use call::call_handler;
pub use metrics::metrics_handler;
