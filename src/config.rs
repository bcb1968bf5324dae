use chrono_tz::Tz;
use clap::Parser;

use crate::error::ConfigError;

// CLI argument structure. Every flag can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "daily-quota-gateway")]
#[command(about = "Per-client daily call quota in front of an expensive backend")]
pub struct Args {
    // Address to bind the quota listener on
    #[arg(long, env = "QUOTA_HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "QUOTA_PORT", default_value_t = 5001)]
    pub port: u16,

    /// Calls allowed per client per calendar day
    #[arg(short = 'l', long, env = "QUOTA_DAILY_LIMIT", default_value_t = 10)]
    pub daily_limit: u32,

    /// IANA zone whose midnight resets every client's window
    #[arg(short, long, env = "QUOTA_TIMEZONE", default_value = "Asia/Seoul")]
    pub timezone: String,

    // Separate operator listener for /metrics, off unless set
    #[arg(long, env = "QUOTA_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

// Settings the quota service is built from; fixed for the process lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaConfig {
    pub daily_limit: u32,
    pub timezone: Tz,
}

impl Args {
    pub fn quota_config(&self) -> Result<QuotaConfig, ConfigError> {
        Ok(QuotaConfig {
            daily_limit: self.daily_limit,
            timezone: parse_timezone(&self.timezone)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))
}
