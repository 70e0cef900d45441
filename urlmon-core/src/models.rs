use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{Error, Result};

/// Allowed bounds for a monitor's check interval, in minutes.
pub const MIN_CHECK_INTERVAL: i64 = 5;
pub const MAX_CHECK_INTERVAL: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Monitor {
    pub id: i64,
    pub url: String,
    /// Minutes between checks, always within [MIN_CHECK_INTERVAL, MAX_CHECK_INTERVAL].
    pub check_interval: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// One immutable record of a single probe attempt against a monitor.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HealthCheck {
    pub id: i64,
    pub monitor_id: i64,
    /// None when the probe failed before receiving any response.
    pub status_code: Option<i64>,
    /// Wall-clock round-trip milliseconds, time-to-failure on a failed probe.
    pub latency: f64,
    pub is_up: bool,
    /// Populated only on a transport-level fault (timeout, DNS, refused, TLS).
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMonitorRequest {
    pub url: String,
    pub check_interval: i64,
}

impl CreateMonitorRequest {
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.url)
            .map_err(|e| Error::validation(format!("invalid url: {}", e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::validation(format!(
                    "unsupported url scheme: {}",
                    other
                )));
            }
        }

        if self.check_interval < MIN_CHECK_INTERVAL || self.check_interval > MAX_CHECK_INTERVAL {
            return Err(Error::validation(format!(
                "check_interval must be between {} and {} minutes",
                MIN_CHECK_INTERVAL, MAX_CHECK_INTERVAL
            )));
        }

        Ok(())
    }
}
