//! Repository for the `flow_checkpoints` table.
//!
//! One row per ticket, replaced in full on every transition of its run.

use remedy_core::execution::ExecutionState;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::checkpoint::FlowCheckpointRow;

/// Column list for `flow_checkpoints` queries.
const COLUMNS: &str = "ticket_id, phase, state, created_at, updated_at";

/// Provides persistence operations for flow checkpoints.
pub struct FlowCheckpointRepo;

impl FlowCheckpointRepo {
    /// Insert or replace the checkpoint for the state's ticket.
    ///
    /// Uses `ON CONFLICT` to upsert; `created_at` keeps the time of the
    /// first write.
    pub async fn upsert(
        pool: &PgPool,
        state: &ExecutionState,
    ) -> Result<FlowCheckpointRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO flow_checkpoints (ticket_id, phase, state) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (ticket_id) DO UPDATE SET \
                 phase      = EXCLUDED.phase, \
                 state      = EXCLUDED.state, \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FlowCheckpointRow>(&query)
            .bind(state.checkpoint_key())
            .bind(state.phase.as_str())
            .bind(Json(state))
            .fetch_one(pool)
            .await
    }

    /// Find the checkpoint for a ticket.
    pub async fn find_by_ticket(
        pool: &PgPool,
        ticket_id: &str,
    ) -> Result<Option<FlowCheckpointRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM flow_checkpoints WHERE ticket_id = $1");
        sqlx::query_as::<_, FlowCheckpointRow>(&query)
            .bind(ticket_id)
            .fetch_optional(pool)
            .await
    }

    /// List checkpoints of runs that have not reached a terminal phase,
    /// oldest update first.
    pub async fn list_unfinished(pool: &PgPool) -> Result<Vec<FlowCheckpointRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM flow_checkpoints \
             WHERE phase NOT IN ('complete', 'error') \
             ORDER BY updated_at ASC"
        );
        sqlx::query_as::<_, FlowCheckpointRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Delete the checkpoint for a ticket.
    ///
    /// Returns the number of rows deleted.
    pub async fn delete(pool: &PgPool, ticket_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM flow_checkpoints WHERE ticket_id = $1")
            .bind(ticket_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
