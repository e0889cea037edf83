//! Shared fixtures for engine integration tests.
//!
//! Scripts are written as `.py` files but interpreted by `bash`, so the
//! tests need neither Python nor Node installed.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use remedy_core::catalog::DirectoryCatalog;
use remedy_core::checkpoint::{CheckpointStore, MemoryCheckpointStore};
use remedy_core::error::CoreError;
use remedy_core::execution::ExecutionState;
use remedy_core::flow::{FlowEntry, FlowResolver, FlowTable};
use remedy_core::scripting::{RuntimeConfig, ScriptRunner};
use remedy_core::ticket::{TicketRef, TicketState, TicketSync};
use remedy_pipeline::FlowEngine;
use tempfile::TempDir;

pub const CLASSIFICATION: &str = "Reset user password";
pub const FLOW_NAME: &str = "ResetPassword";
pub const FALLBACK_GROUP: &str = "L2 Service Desk";

// ---------------------------------------------------------------------------
// Ticket sync double
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCall {
    Status(i16),
    Note(String),
    Reassign(String),
}

/// The sync operations, used to pick which call a double should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOp {
    Status,
    Note,
    Reassign,
}

/// Records every successful sync call in order. Optionally fails the first
/// call of one operation with `SyncFailed`; that call is not recorded.
#[derive(Debug, Default)]
pub struct RecordingTicketSync {
    calls: Mutex<Vec<SyncCall>>,
    fail_once: Mutex<Option<SyncOp>>,
}

impl RecordingTicketSync {
    pub fn failing_once(op: SyncOp) -> Self {
        Self {
            fail_once: Mutex::new(Some(op)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<SyncCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: SyncOp, call: SyncCall) -> Result<(), CoreError> {
        let mut fail_once = self.fail_once.lock().unwrap();
        if *fail_once == Some(op) {
            *fail_once = None;
            return Err(CoreError::SyncFailed("503 Service Unavailable".into()));
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl TicketSync for RecordingTicketSync {
    async fn set_status(&self, _ticket: &TicketRef, state: TicketState) -> Result<(), CoreError> {
        self.record(SyncOp::Status, SyncCall::Status(state.code()))
    }

    async fn append_note(&self, _ticket: &TicketRef, text: &str) -> Result<(), CoreError> {
        self.record(SyncOp::Note, SyncCall::Note(text.to_string()))
    }

    async fn reassign(&self, _ticket: &TicketRef, group: &str) -> Result<(), CoreError> {
        self.record(SyncOp::Reassign, SyncCall::Reassign(group.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Checkpoint store double
// ---------------------------------------------------------------------------

/// Memory store whose `n`th save (1-based) fails once.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryCheckpointStore,
    saves: AtomicUsize,
    fail_on: AtomicUsize,
}

impl FlakyStore {
    pub fn failing_on(save_number: usize) -> Self {
        Self {
            fail_on: AtomicUsize::new(save_number),
            ..Self::default()
        }
    }
}

#[async_trait]
impl CheckpointStore for FlakyStore {
    async fn load(&self, key: &str) -> Result<Option<ExecutionState>, CoreError> {
        self.inner.load(key).await
    }

    async fn save(&self, state: &ExecutionState) -> Result<(), CoreError> {
        let n = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on.load(Ordering::SeqCst) {
            self.fail_on.store(0, Ordering::SeqCst);
            return Err(CoreError::Checkpoint("disk full".into()));
        }
        self.inner.save(state).await
    }

    async fn remove(&self, key: &str) -> Result<bool, CoreError> {
        self.inner.remove(key).await
    }
}

// ---------------------------------------------------------------------------
// Flow fixture
// ---------------------------------------------------------------------------

/// A temporary use-case tree with one flow directory.
pub struct Fixture {
    pub root: TempDir,
    pub sync: Arc<RecordingTicketSync>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_sync(RecordingTicketSync::default())
    }

    pub fn with_sync(sync: RecordingTicketSync) -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(root.path().join("UseCases").join(FLOW_NAME))
            .expect("create flow dir");
        Self {
            root,
            sync: Arc::new(sync),
        }
    }

    pub fn use_cases_dir(&self) -> PathBuf {
        self.root.path().join("UseCases")
    }

    pub fn flow_dir(&self) -> PathBuf {
        self.use_cases_dir().join(FLOW_NAME)
    }

    /// Write a script into the flow directory.
    pub fn script(&self, name: &str, body: &str) -> &Self {
        std::fs::write(self.flow_dir().join(name), body).expect("write script");
        self
    }

    /// Script that records its own execution in `runs.log` outside the flow
    /// directory, then prints `stdout`.
    pub fn tracked_script(&self, name: &str, stdout: &str) -> &Self {
        let body = format!(
            "echo {name} >> ../../runs.log\ncat <<'OUT'\n{stdout}\nOUT\n"
        );
        self.script(name, &body)
    }

    /// Names of tracked scripts in the order they ran.
    pub fn runs(&self) -> Vec<String> {
        std::fs::read_to_string(self.root.path().join("runs.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn engine(&self) -> FlowEngine {
        self.engine_with_store(Arc::new(MemoryCheckpointStore::new()))
    }

    pub fn engine_with_store(&self, store: Arc<dyn CheckpointStore>) -> FlowEngine {
        let runtime = RuntimeConfig {
            python_bin: "bash".into(),
            node_bin: "bash".into(),
            ..RuntimeConfig::default()
        };
        FlowEngine::new(
            resolver(),
            Arc::new(DirectoryCatalog::new(self.use_cases_dir())),
            ScriptRunner::new(&runtime),
            self.sync.clone(),
            store,
        )
    }
}

pub fn resolver() -> FlowResolver {
    FlowResolver::new(FlowTable {
        flows: vec![FlowEntry {
            short_description: Some(CLASSIFICATION.into()),
            flow_name: Some(FLOW_NAME.into()),
            reassignment_group: Some(FALLBACK_GROUP.into()),
        }],
    })
}

pub fn ticket(number: &str) -> TicketRef {
    ticket_with(number, CLASSIFICATION)
}

pub fn ticket_with(number: &str, classification: &str) -> TicketRef {
    TicketRef {
        sys_id: format!("sys-{number}"),
        number: number.to_string(),
        table: "sc_task".into(),
        classification: classification.to_string(),
        state_code: Some(1),
        notes: Vec::new(),
        context: serde_json::json!({
            "result": [{ "number": number, "short_description": classification }]
        }),
    }
}
