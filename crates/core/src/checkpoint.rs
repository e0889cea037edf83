//! Durable run checkpoints: the store trait plus in-memory and file-backed
//! implementations.
//!
//! A checkpoint is the full serialized [`ExecutionState`] of a run, keyed by
//! ticket number and rewritten after every transition. The PostgreSQL store
//! lives in the `db` crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::CoreError;
use crate::execution::ExecutionState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default directory for file-backed checkpoints.
pub const DEFAULT_CHECKPOINT_DIR: &str = "data/checkpoints";

/// Maximum serialized checkpoint size in bytes (16 MB).
pub const MAX_CHECKPOINT_SIZE_BYTES: u64 = 16 * 1024 * 1024;

/// Maximum length of a checkpoint key.
pub const MAX_CHECKPOINT_KEY_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Keyed store holding at most one checkpoint per ticket.
///
/// `save` replaces the whole state atomically: a reader sees either the
/// previous checkpoint or the new one, never a mix.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<ExecutionState>, CoreError>;

    async fn save(&self, state: &ExecutionState) -> Result<(), CoreError>;

    /// Delete the checkpoint. Returns whether one existed.
    async fn remove(&self, key: &str) -> Result<bool, CoreError>;
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that a checkpoint key is safe to use as a file name.
pub fn validate_checkpoint_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("checkpoint key must not be empty".to_string());
    }
    if key.len() > MAX_CHECKPOINT_KEY_LEN {
        return Err(format!(
            "checkpoint key exceeds {MAX_CHECKPOINT_KEY_LEN} characters"
        ));
    }
    if key.starts_with('.') {
        return Err("checkpoint key must not start with '.'".to_string());
    }
    if let Some(c) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!("checkpoint key contains invalid character {c:?}"));
    }
    Ok(())
}

/// Validate that serialized checkpoint data is within the size budget.
pub fn validate_checkpoint_size(size_bytes: u64) -> Result<(), String> {
    if size_bytes > MAX_CHECKPOINT_SIZE_BYTES {
        return Err(format!(
            "Checkpoint size {}MB exceeds maximum {}MB",
            size_bytes / (1024 * 1024),
            MAX_CHECKPOINT_SIZE_BYTES / (1024 * 1024),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    states: RwLock<HashMap<String, ExecutionState>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, key: &str) -> Result<Option<ExecutionState>, CoreError> {
        Ok(self.states.read().await.get(key).cloned())
    }

    async fn save(&self, state: &ExecutionState) -> Result<(), CoreError> {
        self.states
            .write()
            .await
            .insert(state.checkpoint_key().to_string(), state.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, CoreError> {
        Ok(self.states.write().await.remove(key).is_some())
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// One JSON file per ticket under a base directory.
///
/// Writes go to a temporary sibling file which is flushed to disk and then
/// renamed over the checkpoint, so a crash mid-write leaves the previous
/// checkpoint intact.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CoreError> {
        validate_checkpoint_key(key).map_err(CoreError::Checkpoint)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

/// Create `path`, write `bytes` and wait for them to reach the disk.
async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> CoreError {
    CoreError::Checkpoint(format!("failed to {action} {}: {e}", path.display()))
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self, key: &str) -> Result<Option<ExecutionState>, CoreError> {
        let path = self.path_for(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read", &path, e)),
        };
        let state = serde_json::from_slice(&bytes).map_err(|e| {
            CoreError::Checkpoint(format!("corrupt checkpoint {}: {e}", path.display()))
        })?;
        Ok(Some(state))
    }

    async fn save(&self, state: &ExecutionState) -> Result<(), CoreError> {
        let path = self.path_for(state.checkpoint_key())?;
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| CoreError::Checkpoint(format!("failed to serialize checkpoint: {e}")))?;
        validate_checkpoint_size(bytes.len() as u64).map_err(CoreError::Checkpoint)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error("create", &self.dir, e))?;

        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", state.checkpoint_key(), uuid::Uuid::new_v4()));
        if let Err(e) = write_synced(&tmp, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error("write", &tmp, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error("replace", &path, e));
        }

        tracing::trace!(key = %state.checkpoint_key(), path = %path.display(), "Checkpoint written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, CoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("remove", &path, e)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::execution::FlowPhase;
    use crate::flow::FlowDefinition;
    use crate::ticket::TicketRef;

    fn sample_state(number: &str) -> ExecutionState {
        let ticket = TicketRef {
            sys_id: "9d3c".into(),
            number: number.into(),
            table: "sc_task".into(),
            classification: "Unlock account".into(),
            state_code: None,
            notes: Vec::new(),
            context: json!({"result": [{"number": number}]}),
        };
        let flow = FlowDefinition {
            flow_name: "UnlockAccount".into(),
            fallback_group: "Identity Team".into(),
        };
        ExecutionState::new(ticket, flow)
    }

    #[test]
    fn valid_keys_accepted() {
        assert!(validate_checkpoint_key("SCTASK0012345").is_ok());
        assert!(validate_checkpoint_key("INC-42_a.b").is_ok());
    }

    #[test]
    fn path_like_keys_rejected() {
        assert!(validate_checkpoint_key("").is_err());
        assert!(validate_checkpoint_key("../etc/passwd").is_err());
        assert!(validate_checkpoint_key("a/b").is_err());
        assert!(validate_checkpoint_key(".hidden").is_err());
        assert!(validate_checkpoint_key(&"x".repeat(MAX_CHECKPOINT_KEY_LEN + 1)).is_err());
    }

    #[test]
    fn oversized_checkpoint_rejected() {
        assert!(validate_checkpoint_size(MAX_CHECKPOINT_SIZE_BYTES).is_ok());
        let err = validate_checkpoint_size(MAX_CHECKPOINT_SIZE_BYTES + 1).unwrap_err();
        assert!(err.contains("exceeds maximum"));
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryCheckpointStore::new();
        let mut state = sample_state("SCTASK0000001");
        store.save(&state).await.unwrap();

        state.phase = FlowPhase::Decide;
        state.cursor = 0;
        store.save(&state).await.unwrap();

        let loaded = store.load("SCTASK0000001").await.unwrap().unwrap();
        assert_eq!(loaded.phase, FlowPhase::Decide);
        assert!(store.remove("SCTASK0000001").await.unwrap());
        assert!(!store.remove("SCTASK0000001").await.unwrap());
        assert!(store.load("SCTASK0000001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_replaces_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("checkpoints"));

        let mut state = sample_state("SCTASK0000002");
        store.save(&state).await.unwrap();
        state.phase = FlowPhase::Complete;
        state.variables.insert("X".into(), json!("1"));
        store.save(&state).await.unwrap();

        let loaded = store.load("SCTASK0000002").await.unwrap().unwrap();
        assert_eq!(loaded, state);

        let files: Vec<_> = std::fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files, vec!["SCTASK0000002.json"]);
    }

    #[tokio::test]
    async fn file_store_writes_whole_checkpoint_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());

        let mut state = sample_state("SCTASK0000004");
        for i in 0..500 {
            state.variables.insert(format!("VAR_{i}"), json!("x".repeat(64)));
        }
        store.save(&state).await.unwrap();

        let on_disk = std::fs::read(dir.path().join("SCTASK0000004.json")).unwrap();
        assert_eq!(on_disk, serde_json::to_vec_pretty(&state).unwrap());
    }

    #[tokio::test]
    async fn file_store_failed_replace_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());
        // A directory in the checkpoint's place makes the rename fail.
        std::fs::create_dir(dir.path().join("SCTASK0000005.json")).unwrap();

        let err = store.save(&sample_state("SCTASK0000005")).await.unwrap_err();

        assert_matches!(err, CoreError::Checkpoint(ref msg) if msg.contains("failed to replace"));
        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(files, vec!["SCTASK0000005.json"]);
    }

    #[tokio::test]
    async fn file_store_missing_checkpoint_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());
        assert!(store.load("SCTASK0000003").await.unwrap().is_none());
        assert!(!store.remove("SCTASK0000003").await.unwrap());
    }

    #[tokio::test]
    async fn file_store_rejects_unsafe_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());
        let err = store.load("../escape").await.unwrap_err();
        assert_matches!(err, CoreError::Checkpoint(_));
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("SCTASK0000004.json"), b"{not json").unwrap();
        let store = FileCheckpointStore::new(dir.path());

        let err = store.load("SCTASK0000004").await.unwrap_err();
        assert_matches!(err, CoreError::Checkpoint(ref msg) if msg.contains("corrupt"));
    }
}
