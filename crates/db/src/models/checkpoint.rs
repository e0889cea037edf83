//! Row model for the `flow_checkpoints` table.

use remedy_core::execution::ExecutionState;
use remedy_core::types::Timestamp;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `flow_checkpoints` table.
///
/// `phase` duplicates `state.phase` so unfinished runs can be found without
/// reading the JSON.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FlowCheckpointRow {
    pub ticket_id: String,
    pub phase: String,
    pub state: Json<ExecutionState>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl FlowCheckpointRow {
    pub fn into_state(self) -> ExecutionState {
        self.state.0
    }
}
