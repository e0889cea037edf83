//! Remedy domain core.
//!
//! Pure building blocks shared by the engine, the API server and the
//! storage adapters. No database or HTTP access lives here:
//!
//! - [`FlowResolver`]: classification to flow lookup.
//! - [`ScriptRunner`]: per-extension script invocation.
//! - [`normalizer::normalize`]: raw script output to [`StepResult`].
//! - [`ExecutionState`]: the checkpointed unit of work.
//! - [`CheckpointStore`], [`ScriptCatalog`], [`TicketSync`]: the seams the
//!   engine is wired through.

pub mod catalog;
pub mod checkpoint;
pub mod error;
pub mod execution;
pub mod flow;
pub mod normalizer;
pub mod script_types;
pub mod scripting;
pub mod step;
pub mod ticket;
pub mod types;

pub use catalog::{DirectoryCatalog, ScriptCatalog};
pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use error::{CoreError, ErrorKind};
pub use execution::{ExecutionState, FlowPhase, StepCapture, StepRecord};
pub use flow::{FlowDefinition, FlowResolver, FlowTable};
pub use scripting::{RawResult, RuntimeConfig, ScriptRunner};
pub use step::{StepOutputs, StepResult, StepStatus};
pub use ticket::{TicketPayload, TicketRef, TicketState, TicketSync};
pub use types::{Timestamp, Variables};
