//! PowerShell script strategy.
//!
//! PowerShell scripts do not take a serialized argument. Instead the script
//! text is prefixed with a header that binds the ticket context and the
//! accumulated variables as named PowerShell variables:
//!
//! - `$SCTASK_RESPONSE`: the `result` array of the inbound ticket payload
//! - `$ADDITIONAL_VARIABLES`: variables produced by earlier steps
//!
//! and the combined text is run with `-Command`.

use std::path::Path;

use serde_json::Value;

use super::executor::{RawResult, ScriptExecutor, ScriptInput};
use super::subprocess;
use crate::types::Variables;

/// Executor for `.ps1` scripts.
pub struct PowerShellExecutor {
    program: String,
}

impl PowerShellExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Build the command text: binding header followed by the script body.
pub fn build_command_text(
    script_body: &str,
    ticket_context: &Value,
    variables: &Variables,
) -> Result<String, serde_json::Error> {
    let context_json = serde_json::to_string(ticket_context)?;
    let variables_json = serde_json::to_string(variables)?;
    Ok(format!(
        "$jsonObject = '{}' | ConvertFrom-Json; \
         $SCTASK_RESPONSE = $jsonObject.result; \
         $ADDITIONAL_VARIABLES = '{}' | ConvertFrom-Json; \
         {script_body}",
        quote_literal(&context_json),
        quote_literal(&variables_json),
    ))
}

/// Escape text for a single-quoted PowerShell string literal.
fn quote_literal(text: &str) -> String {
    text.replace('\'', "''")
}

impl ScriptExecutor for PowerShellExecutor {
    async fn execute(&self, script_path: &Path, input: ScriptInput) -> RawResult {
        let body = tokio::fs::read_to_string(script_path).await?;
        let command_text = build_command_text(&body, &input.ticket_context, &input.variables)?;

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(["-NoProfile", "-NonInteractive", "-Command"])
            .arg(command_text);
        subprocess::run_command(&mut cmd, input).await
    }
}
