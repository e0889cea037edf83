//! The canonical per-script result shape.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::types::Variables;

/// Note recorded when a successful structured output has no message.
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Execution Successful";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Success,
    Error,
}

/// What a script produced, after parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StepOutputs {
    /// A JSON object; on success its keys are merged into the variables.
    Structured(Variables),
    /// Plain text or a non-object JSON value.
    Text(String),
    Empty,
}

/// Result of one script invocation, folded into the execution state and
/// then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub status: StepStatus,
    pub outputs: StepOutputs,
    /// Human-readable outcome: the success message, or the error text.
    pub message: String,
    /// Error text; empty on success.
    pub error_message: String,
    pub error_kind: Option<ErrorKind>,
}

impl StepResult {
    pub fn success(outputs: StepOutputs, message: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Success,
            outputs,
            message: message.into(),
            error_message: String::new(),
            error_kind: None,
        }
    }

    pub fn failure(kind: ErrorKind, outputs: StepOutputs, error_message: impl Into<String>) -> Self {
        let error_message = error_message.into();
        Self {
            status: StepStatus::Error,
            outputs,
            message: error_message.clone(),
            error_message,
            error_kind: Some(kind),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}
