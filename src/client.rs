//! Front-end side of the quota contract.
//!
//! One `POST /api/call` per user action, no retries, and anything other than a
//! clean "allowed" answer blocks the downstream work.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::models::CallResponse;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// What the front end should do with the current user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed { count: u32 },
    Denied { message: String },
    // service could not vouch for the call; treated as a denial
    Unavailable { reason: String },
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed { .. })
    }

    // Text to show the user when the action was not run
    pub fn notice(&self) -> Option<&str> {
        match self {
            Verdict::Allowed { .. } => None,
            Verdict::Denied { message } => Some(message.as_str()),
            Verdict::Unavailable { .. } => Some("Could not verify your daily quota. Please try again later."),
        }
    }
}

#[derive(Debug)]
pub enum Gated<T> {
    Ran { count: u32, output: T },
    Blocked(Verdict),
}

#[derive(Debug, Clone)]
pub struct QuotaClient {
    client: reqwest::Client,
    call_url: String,
}

impl QuotaClient {
    // `base_url` like "http://localhost:5001"; http:// is added if missing
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(ClientError::Transport)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        let base = base_url.trim().trim_end_matches('/');
        let base = if base.starts_with("http") {
            base.to_string()
        } else {
            format!("http://{}", base)
        };
        Self {
            client,
            call_url: format!("{}/api/call", base),
        }
    }

    pub fn call_url(&self) -> &str {
        &self.call_url
    }

    /// Asks the service once whether the current action may proceed.
    ///
    /// Never returns an error: transport failures, bad statuses and
    /// unreadable bodies all come back as [`Verdict::Unavailable`].
    pub async fn check(&self) -> Verdict {
        match self.request().await {
            Ok(body) if body.success => match body.count {
                Some(count) => Verdict::Allowed { count },
                None => self.unavailable(ClientError::MissingCount),
            },
            Ok(body) => Verdict::Denied {
                message: body
                    .message
                    .unwrap_or_else(|| "Daily API call limit exceeded.".to_string()),
            },
            Err(e) => self.unavailable(e),
        }
    }

    /// Runs `action` only when the service allows it.
    pub async fn gate<F, Fut, T>(&self, action: F) -> Gated<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.check().await {
            Verdict::Allowed { count } => Gated::Ran {
                count,
                output: action().await,
            },
            blocked => {
                debug!(?blocked, "downstream action skipped");
                Gated::Blocked(blocked)
            }
        }
    }

    async fn request(&self) -> Result<CallResponse, ClientError> {
        let res = self
            .client
            .post(&self.call_url)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        if !res.status().is_success() {
            return Err(ClientError::UnexpectedStatus(res.status()));
        }
        res.json::<CallResponse>().await.map_err(ClientError::Decode)
    }

    fn unavailable(&self, e: ClientError) -> Verdict {
        warn!(url = %self.call_url, error = %e, "quota check failed, denying");
        Verdict::Unavailable {
            reason: e.to_string(),
        }
    }
}
