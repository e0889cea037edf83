//! Script invocation contract shared by every runtime strategy.
//!
//! Defines [`ScriptExecutor`], implemented once per supported extension,
//! along with [`ScriptInput`], [`ScriptOutput`], and [`ScriptError`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorKind;
use crate::types::Variables;

/// Everything a strategy may hand to a script.
#[derive(Debug, Clone, Default)]
pub struct ScriptInput {
    /// Variables accumulated by earlier steps.
    pub variables: Variables,
    /// The full ticket payload.
    pub ticket_context: Value,
    /// Additional environment variables set for the child process.
    pub env_vars: Vec<(String, String)>,
    /// Working directory for the child process (uses current dir if `None`).
    pub working_directory: Option<PathBuf>,
    /// Hard limit on wall-clock time; `None` waits for the process to exit.
    pub timeout: Option<Duration>,
}

/// Captured output from a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptOutput {
    /// Complete stdout captured from the process.
    pub stdout: String,
    /// Complete stderr captured from the process.
    pub stderr: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl ScriptOutput {
    pub fn exited_successfully(&self) -> bool {
        self.exit_code == 0
    }
}

/// Reasons a script could not be run to completion.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The script file was not found at the specified path.
    #[error("Script file not found: {0}")]
    NotFound(String),

    /// No strategy handles the script's extension.
    #[error("Unsupported script type: {0}")]
    UnsupportedType(String),

    /// The script exceeded its configured timeout and was killed.
    #[error("Script timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The script wrote more than the capture limit to one of its streams.
    /// The excess is drained and discarded.
    #[error("Script {stream} exceeded the {limit}-byte capture limit")]
    OutputTooLarge { stream: &'static str, limit: usize },

    /// Variables could not be serialized for the script.
    #[error("Cannot encode script input: {0}")]
    Encode(#[from] serde_json::Error),

    /// An I/O error occurred while spawning or communicating with the process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScriptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::ScriptNotFound,
            Self::UnsupportedType(_) => ErrorKind::UnsupportedScriptType,
            Self::OutputTooLarge { .. } => ErrorKind::OutputMalformed,
            Self::Timeout { .. } | Self::Encode(_) | Self::Io(_) => {
                ErrorKind::ScriptExecutionFailed
            }
        }
    }
}

/// What the runner hands to the normalizer: either a finished process or
/// the reason no process could be run.
pub type RawResult = Result<ScriptOutput, ScriptError>;

/// Trait implemented by every invocation strategy.
///
/// Each strategy receives a file path and the step input, spawns the
/// appropriate subprocess, and returns the captured output or an error.
pub trait ScriptExecutor: Send + Sync {
    /// Execute the script at `script_path` with the given `input`.
    fn execute(
        &self,
        script_path: &Path,
        input: ScriptInput,
    ) -> impl std::future::Future<Output = RawResult> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
