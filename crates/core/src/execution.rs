//! Per-run execution state: the unit of work the flow engine advances and
//! checkpoints after every transition.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::flow::FlowDefinition;
use crate::step::{StepResult, StepStatus};
use crate::ticket::TicketRef;
use crate::types::{Timestamp, Variables};

/// Phases of a run. `Init` is the sole entry phase; `Complete` and `Error`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPhase {
    Init,
    Discover,
    Decide,
    Execute,
    Report,
    Complete,
    Error,
}

impl FlowPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Discover => "discover",
            Self::Decide => "decide",
            Self::Execute => "execute",
            Self::Report => "report",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for FlowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the execution log. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub script: String,
    pub status: StepStatus,
    /// Note produced by the step (success message or error text).
    pub message: String,
    pub error_message: String,
    pub error_kind: Option<ErrorKind>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub duration_ms: u64,
}

/// Raw process facts captured alongside a [`StepResult`].
#[derive(Debug, Clone, Default)]
pub struct StepCapture {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub run_id: uuid::Uuid,
    pub ticket: TicketRef,
    pub flow: FlowDefinition,
    pub phase: FlowPhase,
    /// Script identifiers, in execution order.
    pub actions: Vec<String>,
    /// Index of the next action. Only ever increases.
    pub cursor: usize,
    pub variables: Variables,
    pub last_note: String,
    pub execution_log: Vec<StepRecord>,
    /// Set once any step fails; no script runs afterwards.
    pub failed: bool,
    pub started_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ExecutionState {
    /// Fresh state for a run of `flow` against `ticket`, in `Init`.
    pub fn new(ticket: TicketRef, flow: FlowDefinition) -> Self {
        let now = chrono::Utc::now();
        Self {
            run_id: uuid::Uuid::now_v7(),
            ticket,
            flow,
            phase: FlowPhase::Init,
            actions: Vec::new(),
            cursor: 0,
            variables: Variables::new(),
            last_note: String::new(),
            execution_log: Vec::new(),
            failed: false,
            started_at: now,
            updated_at: now,
        }
    }

    /// Key under which this run is checkpointed.
    pub fn checkpoint_key(&self) -> &str {
        &self.ticket.number
    }

    /// The action the cursor points at, if any remain.
    pub fn current_action(&self) -> Option<&str> {
        self.actions.get(self.cursor).map(String::as_str)
    }

    pub fn has_pending_actions(&self) -> bool {
        self.cursor < self.actions.len()
    }

    /// Zero the per-run progress fields.
    pub fn reset_progress(&mut self) {
        self.actions.clear();
        self.cursor = 0;
        self.variables.clear();
        self.execution_log.clear();
        self.last_note.clear();
        self.failed = false;
    }

    /// Fold one step into the state: append to the log, update the note,
    /// and advance the cursor whatever the outcome.
    pub fn record_step(
        &mut self,
        script: &str,
        result: &StepResult,
        capture: StepCapture,
        started_at: Timestamp,
    ) {
        if result.is_success() {
            self.last_note = result.message.clone();
        } else {
            self.failed = true;
            self.last_note = format!("Error in {script}: {}", result.error_message);
        }

        self.execution_log.push(StepRecord {
            script: script.to_string(),
            status: result.status,
            message: result.message.clone(),
            error_message: result.error_message.clone(),
            error_kind: result.error_kind,
            stdout: capture.stdout,
            stderr: capture.stderr,
            exit_code: capture.exit_code,
            started_at,
            finished_at: chrono::Utc::now(),
            duration_ms: capture.duration_ms,
        });

        self.cursor += 1;
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now();
    }
}
