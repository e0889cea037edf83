//! The flow execution state machine.
//!
//! ```text
//! Init -> Discover -> Decide -> { Execute -> Report -> Decide }* -> Complete | Error
//! ```
//!
//! Every transition is followed by a checkpoint write, so an interrupted run
//! picks up at the phase it had reached. A script that already ran to
//! completion and was recorded is never run again.

use std::sync::Arc;

use remedy_core::catalog::ScriptCatalog;
use remedy_core::checkpoint::CheckpointStore;
use remedy_core::error::CoreError;
use remedy_core::execution::{ExecutionState, FlowPhase, StepCapture};
use remedy_core::flow::FlowResolver;
use remedy_core::normalizer::normalize;
use remedy_core::scripting::{RawResult, ScriptRunner};
use remedy_core::ticket::{TicketRef, TicketState, TicketSync};
use serde::{Deserialize, Serialize};

use crate::guard::ActiveRuns;

/// Result of one `run` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub ticket: String,
    pub run_id: uuid::Uuid,
    /// Phase the run ended in. Always terminal.
    pub phase: FlowPhase,
    /// Phases entered during this invocation, ending with the final one.
    /// Empty when the checkpoint was already terminal.
    pub transitions: Vec<FlowPhase>,
    /// Scripts executed during this invocation.
    pub steps_executed: usize,
    /// Whether the run continued from an existing checkpoint.
    pub resumed: bool,
    pub state: ExecutionState,
}

/// Drives ticket runs through the flow phases.
pub struct FlowEngine {
    resolver: FlowResolver,
    catalog: Arc<dyn ScriptCatalog>,
    runner: ScriptRunner,
    tickets: Arc<dyn TicketSync>,
    checkpoints: Arc<dyn CheckpointStore>,
    active: ActiveRuns,
}

impl FlowEngine {
    pub fn new(
        resolver: FlowResolver,
        catalog: Arc<dyn ScriptCatalog>,
        runner: ScriptRunner,
        tickets: Arc<dyn TicketSync>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            resolver,
            catalog,
            runner,
            tickets,
            checkpoints,
            active: ActiveRuns::new(),
        }
    }

    /// Whether a run for `ticket_number` is currently in flight.
    pub fn is_running(&self, ticket_number: &str) -> bool {
        self.active.is_active(ticket_number)
    }

    /// Run `ticket` to a terminal phase, resuming from its checkpoint if one
    /// exists.
    ///
    /// Errors abort the invocation and leave the checkpoint at the last
    /// completed transition: flow resolution and script discovery failures,
    /// ticket sync failures, checkpoint failures, and a concurrent run for
    /// the same ticket. Script failures are not errors here; they end the
    /// run in [`FlowPhase::Error`].
    pub async fn run(&self, ticket: TicketRef) -> Result<RunOutcome, CoreError> {
        let _guard = self
            .active
            .try_acquire(&ticket.number)
            .ok_or_else(|| CoreError::RunInProgress(ticket.number.clone()))?;

        let (mut state, resumed) = match self.checkpoints.load(&ticket.number).await? {
            Some(state) if state.phase.is_terminal() => {
                tracing::info!(
                    ticket = %ticket.number,
                    phase = %state.phase,
                    "Run already finished, returning stored outcome",
                );
                return Ok(outcome(state, Vec::new(), 0, true));
            }
            Some(state) => {
                tracing::info!(
                    ticket = %ticket.number,
                    run_id = %state.run_id,
                    phase = %state.phase,
                    cursor = state.cursor,
                    "Resuming run from checkpoint",
                );
                (state, true)
            }
            None => {
                let flow = self.resolver.resolve(&ticket.classification).map_err(|e| {
                    tracing::error!(
                        ticket = %ticket.number,
                        classification = %ticket.classification,
                        error = %e,
                        "Flow resolution failed",
                    );
                    e
                })?;
                let state = ExecutionState::new(ticket, flow);
                tracing::info!(
                    ticket = %state.ticket.number,
                    run_id = %state.run_id,
                    flow = %state.flow.flow_name,
                    "Starting run",
                );
                self.checkpoints.save(&state).await?;
                (state, false)
            }
        };

        let mut transitions = Vec::new();
        let mut steps_executed = 0;

        while !state.phase.is_terminal() {
            let from = state.phase;
            transitions.push(from);

            let next = match self.transition(&mut state, &mut steps_executed).await {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!(
                        ticket = %state.ticket.number,
                        phase = %from,
                        error = %e,
                        "Run aborted",
                    );
                    return Err(e);
                }
            };

            state.phase = next;
            state.touch();
            self.checkpoints.save(&state).await?;
            tracing::debug!(ticket = %state.ticket.number, from = %from, to = %next, "Transition");
        }
        transitions.push(state.phase);

        tracing::info!(
            ticket = %state.ticket.number,
            run_id = %state.run_id,
            phase = %state.phase,
            steps = state.execution_log.len(),
            "Run finished",
        );

        Ok(outcome(state, transitions, steps_executed, resumed))
    }

    /// The persisted state for `ticket_number`, if any.
    pub async fn checkpoint(&self, ticket_number: &str) -> Result<Option<ExecutionState>, CoreError> {
        self.checkpoints.load(ticket_number).await
    }

    /// Delete the checkpoint so the next run starts from scratch. Refused
    /// while a run for the ticket is active.
    pub async fn discard(&self, ticket_number: &str) -> Result<bool, CoreError> {
        let _guard = self
            .active
            .try_acquire(ticket_number)
            .ok_or_else(|| CoreError::RunInProgress(ticket_number.to_string()))?;
        let removed = self.checkpoints.remove(ticket_number).await?;
        tracing::info!(ticket = %ticket_number, removed, "Checkpoint discarded");
        Ok(removed)
    }

    /// Perform the work of `state.phase` and return the next phase.
    async fn transition(
        &self,
        state: &mut ExecutionState,
        steps_executed: &mut usize,
    ) -> Result<FlowPhase, CoreError> {
        match state.phase {
            FlowPhase::Init => {
                self.tickets
                    .set_status(&state.ticket, TicketState::WorkInProgress)
                    .await?;
                state.ticket.state_code = Some(TicketState::WorkInProgress.code());
                state.reset_progress();
                Ok(FlowPhase::Discover)
            }

            FlowPhase::Discover => {
                state.actions = self.catalog.list_scripts(&state.flow.flow_name).await?;
                tracing::debug!(
                    ticket = %state.ticket.number,
                    flow = %state.flow.flow_name,
                    actions = ?state.actions,
                    "Discovered scripts",
                );
                Ok(FlowPhase::Decide)
            }

            FlowPhase::Decide => {
                if state.failed {
                    self.tickets
                        .reassign(&state.ticket, &state.flow.fallback_group)
                        .await?;
                    tracing::warn!(
                        ticket = %state.ticket.number,
                        group = %state.flow.fallback_group,
                        "Run failed, ticket reassigned to fallback group",
                    );
                    Ok(FlowPhase::Error)
                } else if state.has_pending_actions() {
                    Ok(FlowPhase::Execute)
                } else {
                    self.tickets
                        .set_status(&state.ticket, TicketState::ClosedComplete)
                        .await?;
                    state.ticket.state_code = Some(TicketState::ClosedComplete.code());
                    Ok(FlowPhase::Complete)
                }
            }

            FlowPhase::Execute => {
                if state.failed {
                    return Ok(FlowPhase::Decide);
                }
                let Some(script) = state.current_action().map(str::to_string) else {
                    return Ok(FlowPhase::Decide);
                };
                self.execute_step(state, &script).await;
                *steps_executed += 1;
                Ok(FlowPhase::Report)
            }

            FlowPhase::Report => {
                self.tickets
                    .append_note(&state.ticket, &state.last_note)
                    .await?;
                state.ticket.notes.push(state.last_note.clone());
                Ok(FlowPhase::Decide)
            }

            phase @ (FlowPhase::Complete | FlowPhase::Error) => Ok(phase),
        }
    }

    async fn execute_step(&self, state: &mut ExecutionState, script: &str) {
        let path = self.catalog.script_path(&state.flow.flow_name, script);
        let started_at = chrono::Utc::now();
        tracing::debug!(
            ticket = %state.ticket.number,
            script = %script,
            cursor = state.cursor,
            "Executing script",
        );

        let raw = self
            .runner
            .run(&path, &state.variables, &state.ticket)
            .await;
        let result = normalize(&raw, &mut state.variables);
        state.record_step(script, &result, capture(&raw), started_at);

        if result.is_success() {
            tracing::debug!(ticket = %state.ticket.number, script = %script, "Script succeeded");
        } else {
            tracing::warn!(
                ticket = %state.ticket.number,
                script = %script,
                kind = ?result.error_kind,
                error = %result.error_message,
                "Script failed",
            );
        }
    }
}

fn capture(raw: &RawResult) -> StepCapture {
    match raw {
        Ok(output) => StepCapture {
            stdout: output.stdout.clone(),
            stderr: output.stderr.clone(),
            exit_code: Some(output.exit_code),
            duration_ms: output.duration_ms,
        },
        Err(_) => StepCapture::default(),
    }
}

fn outcome(
    state: ExecutionState,
    transitions: Vec<FlowPhase>,
    steps_executed: usize,
    resumed: bool,
) -> RunOutcome {
    RunOutcome {
        ticket: state.ticket.number.clone(),
        run_id: state.run_id,
        phase: state.phase,
        transitions,
        steps_executed,
        resumed,
        state,
    }
}
