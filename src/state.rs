use std::sync::Arc;

use crate::quota::QuotaService;

// app's shared state
pub struct AppState {
    pub quota: Arc<QuotaService>, // sole owner of the client -> usage table
}

impl AppState {
    pub fn new(quota: QuotaService) -> Self {
        Self {
            quota: Arc::new(quota),
        }
    }
}
