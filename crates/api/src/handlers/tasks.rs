//! Handlers for ticket runs and their checkpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use remedy_core::ticket::{TicketPayload, TicketRef};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Trigger a run
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks
///
/// Run (or resume) the flow for the first ticket in the payload and return
/// the outcome once it reaches a terminal phase.
pub async fn trigger_task(
    State(state): State<AppState>,
    payload: Result<Json<TicketPayload>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    payload.validate()?;

    let ticket = TicketRef::from_payload(&payload)
        .ok_or_else(|| AppError::BadRequest("result must contain at least one record".into()))?;

    tracing::info!(
        ticket = %ticket.number,
        classification = %ticket.classification,
        "Ticket received",
    );

    // Detached so a dropped or timed-out request does not cancel the run
    // between a script finishing and its checkpoint being written.
    let engine = state.engine.clone();
    let outcome = tokio::spawn(async move { engine.run(ticket).await })
        .await
        .map_err(|e| AppError::InternalError(format!("run task failed: {e}")))??;

    Ok(Json(DataResponse { data: outcome }))
}

// ---------------------------------------------------------------------------
// Inspect a checkpoint
// ---------------------------------------------------------------------------

/// GET /api/v1/tasks/{number}/checkpoint
pub async fn get_checkpoint(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> AppResult<impl IntoResponse> {
    let checkpoint = state
        .engine
        .checkpoint(&number)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No checkpoint for ticket {number}")))?;

    Ok(Json(DataResponse { data: checkpoint }))
}

// ---------------------------------------------------------------------------
// Discard a checkpoint
// ---------------------------------------------------------------------------

/// DELETE /api/v1/tasks/{number}/checkpoint
///
/// Lets the next trigger for the ticket start over. Refused with 409 while
/// a run for the ticket is active.
pub async fn discard_checkpoint(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> AppResult<StatusCode> {
    if state.engine.discard(&number).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No checkpoint for ticket {number}")))
    }
}
