//! Script execution: one strategy per supported extension, a shared
//! subprocess layer, and the runner that dispatches between them.
//!
//! All subprocess management is pure (no DB or HTTP access) and lives in
//! the `core` crate for isolation and testability.

pub mod executor;
pub mod node;
pub mod powershell;
pub mod python;
pub mod runner;
pub mod subprocess;

pub use executor::{RawResult, ScriptError, ScriptExecutor, ScriptInput, ScriptOutput};
pub use runner::{RuntimeConfig, ScriptKind, ScriptRunner};
