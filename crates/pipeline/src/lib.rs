//! Remedy flow execution.
//!
//! [`FlowEngine`] advances a ticket's [`ExecutionState`] through the flow
//! phases, running each discovered script in order, mirroring progress to
//! the ticketing system and checkpointing after every transition.
//!
//! [`ExecutionState`]: remedy_core::execution::ExecutionState

pub mod engine;
pub mod guard;

pub use engine::{FlowEngine, RunOutcome};
pub use guard::{ActiveRuns, RunGuard};
