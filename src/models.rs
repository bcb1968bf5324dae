use serde::{Deserialize, Serialize};

// Body of every /api/call response.
// Allowed: {"success": true, "count": n}; denied: {"success": false, "message": "..."}
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CallResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CallResponse {
    pub fn allowed(count: u32) -> Self {
        Self {
            success: true,
            count: Some(count),
            message: None,
        }
    }

    pub fn denied(daily_limit: u32) -> Self {
        Self {
            success: false,
            count: None,
            message: Some(limit_exceeded_message(daily_limit)),
        }
    }
}

pub fn limit_exceeded_message(daily_limit: u32) -> String {
    format!("Daily API call limit exceeded. Only {daily_limit} calls are allowed per day.")
}
