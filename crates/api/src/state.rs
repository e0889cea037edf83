use std::sync::Arc;

use remedy_pipeline::FlowEngine;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// The flow engine every run goes through.
    pub engine: Arc<FlowEngine>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Database pool, present when checkpoints are stored in PostgreSQL.
    pub pool: Option<remedy_db::DbPool>,
}
