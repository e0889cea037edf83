//! Node.js script strategy: `<node> <script> <variables-json>`.

use std::path::Path;

use super::executor::{RawResult, ScriptExecutor, ScriptInput};
use super::subprocess;

/// Executor for JavaScript scripts.
pub struct NodeExecutor {
    interpreter: String,
}

impl NodeExecutor {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

impl ScriptExecutor for NodeExecutor {
    async fn execute(&self, script_path: &Path, input: ScriptInput) -> RawResult {
        let payload = serde_json::to_string(&input.variables)?;
        let mut cmd = tokio::process::Command::new(&self.interpreter);
        cmd.arg(script_path).arg(payload);
        subprocess::run_command(&mut cmd, input).await
    }
}
