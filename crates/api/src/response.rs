//! Shared response envelope for API handlers.
//!
//! Successful responses use a `{ "data": ... }` envelope; errors use the
//! `{ "error", "code" }` body produced by [`crate::error::AppError`].

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
