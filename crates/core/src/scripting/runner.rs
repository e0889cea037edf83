//! Extension-based dispatch to the invocation strategies.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::executor::{RawResult, ScriptError, ScriptExecutor, ScriptInput};
use super::node::NodeExecutor;
use super::powershell::PowerShellExecutor;
use super::python::PythonExecutor;
use crate::script_types::{EXT_NODE, EXT_POWERSHELL, EXT_PYTHON};
use crate::ticket::TicketRef;
use crate::types::Variables;

/// Environment variables identifying the ticket, set for every script.
pub const ENV_TICKET_NUMBER: &str = "TICKET_NUMBER";
pub const ENV_TICKET_SYS_ID: &str = "TICKET_SYS_ID";
pub const ENV_TICKET_TABLE: &str = "TICKET_TABLE";

/// The closed set of supported script kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    Python,
    Node,
    PowerShell,
}

impl ScriptKind {
    /// Classify a script by its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            EXT_PYTHON => Some(Self::Python),
            EXT_NODE => Some(Self::Node),
            EXT_POWERSHELL => Some(Self::PowerShell),
            _ => None,
        }
    }
}

/// Interpreter programs and limits for the runner.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub python_bin: String,
    pub node_bin: String,
    pub powershell_bin: String,
    /// Per-script wall-clock limit; `None` means no limit.
    pub script_timeout: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            python_bin: "python3".into(),
            node_bin: "node".into(),
            powershell_bin: "pwsh".into(),
            script_timeout: None,
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default   |
    /// |-----------------------|-----------|
    /// | `PYTHON_BIN`          | `python3` |
    /// | `NODE_BIN`            | `node`    |
    /// | `POWERSHELL_BIN`      | `pwsh`    |
    /// | `SCRIPT_TIMEOUT_SECS` | unset     |
    ///
    /// A `SCRIPT_TIMEOUT_SECS` that is unset, empty, `0` or not a number
    /// disables the timeout.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let script_timeout = std::env::var("SCRIPT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            python_bin: std::env::var("PYTHON_BIN").unwrap_or(defaults.python_bin),
            node_bin: std::env::var("NODE_BIN").unwrap_or(defaults.node_bin),
            powershell_bin: std::env::var("POWERSHELL_BIN").unwrap_or(defaults.powershell_bin),
            script_timeout,
        }
    }
}

/// Runs one script with the strategy its extension selects.
///
/// Never fails across its boundary: every problem, including a missing
/// file or an unknown extension, comes back as the `Err` side of
/// [`RawResult`] for the normalizer to fold into a step result.
pub struct ScriptRunner {
    python: PythonExecutor,
    node: NodeExecutor,
    powershell: PowerShellExecutor,
    timeout: Option<Duration>,
}

impl ScriptRunner {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            python: PythonExecutor::new(config.python_bin.clone()),
            node: NodeExecutor::new(config.node_bin.clone()),
            powershell: PowerShellExecutor::new(config.powershell_bin.clone()),
            timeout: config.script_timeout,
        }
    }

    /// Run `script_path` with the accumulated `variables`. The ticket's
    /// context is available to strategies that bind it, and its identifiers
    /// are set in the child's environment.
    pub async fn run(
        &self,
        script_path: &Path,
        variables: &Variables,
        ticket: &TicketRef,
    ) -> RawResult {
        let is_file = tokio::fs::metadata(script_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            tracing::error!(script = %script_path.display(), "Script file does not exist");
            return Err(ScriptError::NotFound(script_path.display().to_string()));
        }

        let Some(kind) = ScriptKind::from_path(script_path) else {
            let ext = script_path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{e}"))
                .unwrap_or_else(|| "(none)".to_string());
            tracing::error!(script = %script_path.display(), ext = %ext, "Unsupported script type");
            return Err(ScriptError::UnsupportedType(ext));
        };

        let input = ScriptInput {
            variables: variables.clone(),
            ticket_context: ticket.context.clone(),
            env_vars: vec![
                (ENV_TICKET_NUMBER.to_string(), ticket.number.clone()),
                (ENV_TICKET_SYS_ID.to_string(), ticket.sys_id.clone()),
                (ENV_TICKET_TABLE.to_string(), ticket.table.clone()),
            ],
            working_directory: None,
            timeout: self.timeout,
        };

        tracing::debug!(script = %script_path.display(), kind = ?kind, "Dispatching script");

        let result = match kind {
            ScriptKind::Python => self.python.execute(script_path, input).await,
            ScriptKind::Node => self.node.execute(script_path, input).await,
            ScriptKind::PowerShell => self.powershell.execute(script_path, input).await,
        };

        match &result {
            Ok(output) => tracing::debug!(
                script = %script_path.display(),
                exit_code = output.exit_code,
                duration_ms = output.duration_ms,
                "Script finished",
            ),
            Err(e) => tracing::warn!(
                script = %script_path.display(),
                error = %e,
                "Script could not be run",
            ),
        }

        result
    }
}
