use std::path::PathBuf;

use remedy_core::catalog::DEFAULT_USE_CASES_DIR;
use remedy_core::checkpoint::DEFAULT_CHECKPOINT_DIR;
use remedy_core::flow::DEFAULT_FLOW_MAPPING_PATH;

/// Raised when an environment variable is present but unusable.
#[derive(Debug, thiserror::Error)]
#[error("{name} must be a valid {expected}, got {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `300`). Runs execute
    /// inside the request, so this bounds how long a caller waits.
    pub request_timeout_secs: u64,
    /// Flow mapping file (default: `flow_details.yml`).
    pub flow_mapping_path: PathBuf,
    /// Directory holding one subdirectory of scripts per flow
    /// (default: `UseCases`).
    pub use_cases_dir: PathBuf,
    /// Directory for file checkpoints when no database is configured
    /// (default: `data/checkpoints`).
    pub checkpoint_dir: PathBuf,
    /// PostgreSQL URL. When set, checkpoints are stored in the database.
    pub database_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            request_timeout_secs: 300,
            flow_mapping_path: DEFAULT_FLOW_MAPPING_PATH.into(),
            use_cases_dir: DEFAULT_USE_CASES_DIR.into(),
            checkpoint_dir: DEFAULT_CHECKPOINT_DIR.into(),
            database_url: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default             |
    /// |------------------------|---------------------|
    /// | `HOST`                 | `0.0.0.0`           |
    /// | `PORT`                 | `3000`              |
    /// | `REQUEST_TIMEOUT_SECS` | `300`               |
    /// | `FLOW_MAPPING_PATH`    | `flow_details.yml`  |
    /// | `USE_CASES_DIR`        | `UseCases`          |
    /// | `CHECKPOINT_DIR`       | `data/checkpoints`  |
    /// | `DATABASE_URL`         | unset               |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = std::env::var("HOST").unwrap_or(defaults.host);

        let port: u16 = parse_var("PORT", "u16", defaults.port)?;

        let request_timeout_secs: u64 =
            parse_var("REQUEST_TIMEOUT_SECS", "u64", defaults.request_timeout_secs)?;

        let path_var = |name: &str, default: PathBuf| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default)
        };

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self {
            host,
            port,
            request_timeout_secs,
            flow_mapping_path: path_var("FLOW_MAPPING_PATH", defaults.flow_mapping_path),
            use_cases_dir: path_var("USE_CASES_DIR", defaults.use_cases_dir),
            checkpoint_dir: path_var("CHECKPOINT_DIR", defaults.checkpoint_dir),
            database_url,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError {
            name,
            expected,
            value,
        }),
        Err(_) => Ok(default),
    }
}
