use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown timezone `{0}`, expected an IANA name such as `Asia/Seoul`")]
    UnknownTimezone(String),
}

// Failures talking to the quota service. The client turns all of them into a denial.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("quota service unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("quota service answered with HTTP {0}")]
    UnexpectedStatus(reqwest::StatusCode),
    #[error("quota service sent an unreadable body: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("quota service allowed the call without reporting a count")]
    MissingCount,
}
