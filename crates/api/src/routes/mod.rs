pub mod health;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /tasks                         trigger a run (POST)
/// /tasks/{number}/checkpoint     inspect (GET), discard (DELETE)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/tasks", tasks::router())
}
