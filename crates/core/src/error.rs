use serde::{Deserialize, Serialize};

/// Failures raised while resolving, running, or synchronizing a flow.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("No flow found for classification: {0}")]
    NotFound(String),

    #[error("Invalid flow configuration: {0}")]
    ConfigInvalid(String),

    #[error("Cannot list scripts for flow '{flow}': {reason}")]
    FlowScriptsUnavailable { flow: String, reason: String },

    #[error("Ticket sync failed: {0}")]
    SyncFailed(String),

    #[error("A run is already active for ticket {0}")]
    RunInProgress(String),

    #[error("Checkpoint store error: {0}")]
    Checkpoint(String),
}

/// Why a step failed. Recorded on the step and its log entry; a failed
/// step ends the run in `Error` with fallback reassignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ScriptNotFound,
    UnsupportedScriptType,
    ScriptExecutionFailed,
    OutputMalformed,
}
