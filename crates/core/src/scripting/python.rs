//! Python script strategy.
//!
//! Runs `<python> <script> <variables-json>` from the script's directory.
//! A `venv` directory next to the script takes precedence over the
//! configured interpreter, so each flow can ship its own dependencies.

use std::path::{Path, PathBuf};

use tokio::fs;

use super::executor::{RawResult, ScriptExecutor, ScriptInput};
use super::subprocess;

/// Executor for Python scripts with per-flow venv discovery.
pub struct PythonExecutor {
    /// Interpreter used when the script has no sibling venv.
    interpreter: String,
}

impl PythonExecutor {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Pick the interpreter for `script_path`: the sibling venv's python if
    /// present, otherwise the configured interpreter.
    pub async fn interpreter_for(&self, script_path: &Path) -> PathBuf {
        if let Some(dir) = script_path.parent() {
            for candidate in venv_candidates(dir) {
                if fs::try_exists(&candidate).await.unwrap_or(false) {
                    return candidate;
                }
            }
        }
        PathBuf::from(&self.interpreter)
    }
}

fn venv_candidates(script_dir: &Path) -> [PathBuf; 2] {
    let venv = script_dir.join("venv");
    [
        venv.join("bin").join("python"),
        venv.join("Scripts").join("python.exe"),
    ]
}

impl ScriptExecutor for PythonExecutor {
    async fn execute(&self, script_path: &Path, mut input: ScriptInput) -> RawResult {
        let script_path = fs::canonicalize(script_path).await?;
        let interpreter = self.interpreter_for(&script_path).await;
        let payload = serde_json::to_string(&input.variables)?;

        if input.working_directory.is_none() {
            input.working_directory = script_path.parent().map(Path::to_path_buf);
        }

        tracing::debug!(
            script = %script_path.display(),
            interpreter = %interpreter.display(),
            "Running python script",
        );

        let mut cmd = tokio::process::Command::new(&interpreter);
        cmd.arg(&script_path).arg(payload);
        subprocess::run_command(&mut cmd, input).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
