use std::time::Duration;

use crate::client::TicketingError;
use crate::retry::RetryConfig;

/// Connection settings for the ticketing system's Table API.
#[derive(Clone)]
pub struct TicketingConfig {
    /// Instance base URL, e.g. `https://example.service-now.com`.
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Retries after the first attempt for transport errors and 5xx.
    pub max_retries: u32,
    /// Per-request timeout.
    pub timeout: Duration,
    pub retry: RetryConfig,
}

// Keeps the password out of logs.
impl std::fmt::Debug for TicketingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketingConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TicketingConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                   | Default    |
    /// |---------------------------|------------|
    /// | `SERVICENOW_URL`          | (required) |
    /// | `SERVICENOW_USER`         | (required) |
    /// | `SERVICENOW_PWD`          | (required) |
    /// | `SERVICENOW_MAX_RETRIES`  | `3`        |
    /// | `SERVICENOW_TIMEOUT_SECS` | `30`       |
    pub fn from_env() -> Result<Self, TicketingError> {
        let base_url = required("SERVICENOW_URL")?;
        let username = required("SERVICENOW_USER")?;
        let password = required("SERVICENOW_PWD")?;

        let max_retries: u32 = parsed("SERVICENOW_MAX_RETRIES", 3)?;
        let timeout_secs: u64 = parsed("SERVICENOW_TIMEOUT_SECS", 30)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
            max_retries,
            timeout: Duration::from_secs(timeout_secs),
            retry: RetryConfig::default(),
        })
    }
}

fn required(name: &str) -> Result<String, TicketingError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| TicketingError::Config(format!("{name} must be set")))
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T, TicketingError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| TicketingError::Config(format!("{name} must be a valid number"))),
        Err(_) => Ok(default),
    }
}
