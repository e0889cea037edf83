//! [`CheckpointStore`] backed by the `flow_checkpoints` table.

use async_trait::async_trait;
use remedy_core::checkpoint::CheckpointStore;
use remedy_core::error::CoreError;
use remedy_core::execution::ExecutionState;

use crate::repositories::FlowCheckpointRepo;
use crate::DbPool;

#[derive(Debug, Clone)]
pub struct PgCheckpointStore {
    pool: DbPool,
}

impl PgCheckpointStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn store_error(action: &str, key: &str, e: sqlx::Error) -> CoreError {
    tracing::error!(ticket = %key, error = %e, "Checkpoint {action} failed");
    CoreError::Checkpoint(format!("{action} for {key}: {e}"))
}

#[async_trait]
impl CheckpointStore for PgCheckpointStore {
    async fn load(&self, key: &str) -> Result<Option<ExecutionState>, CoreError> {
        let row = FlowCheckpointRepo::find_by_ticket(&self.pool, key)
            .await
            .map_err(|e| store_error("load", key, e))?;
        Ok(row.map(|r| r.into_state()))
    }

    async fn save(&self, state: &ExecutionState) -> Result<(), CoreError> {
        FlowCheckpointRepo::upsert(&self.pool, state)
            .await
            .map_err(|e| store_error("save", state.checkpoint_key(), e))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, CoreError> {
        let deleted = FlowCheckpointRepo::delete(&self.pool, key)
            .await
            .map_err(|e| store_error("remove", key, e))?;
        Ok(deleted > 0)
    }
}
