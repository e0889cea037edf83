//! Folds a script's raw result into a [`StepResult`] and merges its
//! outputs into the run's variables.
//!
//! Policy, in order:
//!
//! 1. The runner could not run the script, or the process exited non-zero:
//!    error, message is the trimmed stderr (or the runner's error text).
//! 2. Empty stdout, or stdout that is JSON `null`: error ("returned null
//!    output").
//! 3. Stdout that is not JSON: success, message is the trimmed text.
//! 4. A JSON object with `Status == "Success"`: success, every other key is
//!    merged into the variables, message is `OutputMessage` or
//!    [`DEFAULT_SUCCESS_MESSAGE`].
//! 5. A JSON object with any other `Status`: error, message is
//!    `OutputMessage` and `ErrorMessage` joined by a newline. No merge.
//! 6. A JSON object without `Status`: error (malformed output).
//! 7. Any other JSON value: success, message is the value's text. No merge.

use serde_json::Value;

use crate::error::ErrorKind;
use crate::scripting::RawResult;
use crate::step::{StepOutputs, StepResult, DEFAULT_SUCCESS_MESSAGE};
use crate::types::Variables;

const STATUS_KEY: &str = "Status";
const OUTPUT_MESSAGE_KEY: &str = "OutputMessage";
const ERROR_MESSAGE_KEY: &str = "ErrorMessage";
const STATUS_SUCCESS: &str = "Success";

/// Normalize `raw` into a step result. On success, structured outputs are
/// merged into `variables`; on error `variables` is left untouched.
pub fn normalize(raw: &RawResult, variables: &mut Variables) -> StepResult {
    let output = match raw {
        Ok(output) => output,
        Err(e) => return StepResult::failure(e.kind(), StepOutputs::Empty, e.to_string()),
    };

    if !output.exited_successfully() {
        return StepResult::failure(
            ErrorKind::ScriptExecutionFailed,
            StepOutputs::Empty,
            output.stderr.trim(),
        );
    }

    let stdout = output.stdout.trim();
    if stdout.is_empty() {
        return null_output();
    }

    let parsed = match serde_json::from_str::<Value>(stdout) {
        Ok(value) => value,
        Err(_) => return StepResult::success(StepOutputs::Text(stdout.to_string()), stdout),
    };

    match parsed {
        Value::Null => null_output(),
        Value::Object(object) => normalize_object(object, variables),
        Value::String(text) => StepResult::success(StepOutputs::Text(text.clone()), text),
        other => {
            let text = other.to_string();
            StepResult::success(StepOutputs::Text(text.clone()), text)
        }
    }
}

fn normalize_object(mut object: Variables, variables: &mut Variables) -> StepResult {
    let Some(status) = object.get(STATUS_KEY).cloned() else {
        return StepResult::failure(
            ErrorKind::OutputMalformed,
            StepOutputs::Structured(object),
            "script output object has no Status field",
        );
    };

    if status.as_str() == Some(STATUS_SUCCESS) {
        let message = object
            .get(OUTPUT_MESSAGE_KEY)
            .map(message_text)
            .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string());
        object.remove(STATUS_KEY);
        for (key, value) in &object {
            variables.insert(key.clone(), value.clone());
        }
        return StepResult::success(StepOutputs::Structured(object), message);
    }

    let output_message = object.get(OUTPUT_MESSAGE_KEY).map(message_text).unwrap_or_default();
    let error_message = object.get(ERROR_MESSAGE_KEY).map(message_text).unwrap_or_default();
    StepResult::failure(
        ErrorKind::ScriptExecutionFailed,
        StepOutputs::Structured(object),
        format!("{output_message}\n{error_message}"),
    )
}

fn null_output() -> StepResult {
    StepResult::failure(
        ErrorKind::OutputMalformed,
        StepOutputs::Empty,
        "returned null output",
    )
}

/// Strings render bare; anything else renders as JSON text.
fn message_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
