//! Route definitions for ticket runs.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// POST   /                      -> trigger_task
/// GET    /{number}/checkpoint   -> get_checkpoint
/// DELETE /{number}/checkpoint   -> discard_checkpoint
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(tasks::trigger_task))
        .route(
            "/{number}/checkpoint",
            get(tasks::get_checkpoint).delete(tasks::discard_checkpoint),
        )
}
