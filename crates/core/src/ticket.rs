//! Ticket reference, inbound payload shape, and the ticket sync seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::error::CoreError;

/// Record class used when the payload does not name one.
pub const DEFAULT_TICKET_TABLE: &str = "sc_task";

/// Ticket state codes understood by the ticketing system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    Pending,
    Open,
    WorkInProgress,
    ClosedComplete,
    ClosedIncomplete,
    ClosedSkipped,
    Resolved,
}

impl TicketState {
    /// Numeric code sent to the ticketing API.
    pub fn code(self) -> i16 {
        match self {
            Self::Pending => 0,
            Self::Open => 1,
            Self::WorkInProgress => 2,
            Self::ClosedComplete => 3,
            Self::ClosedIncomplete => 4,
            Self::ClosedSkipped => 5,
            Self::Resolved => 6,
        }
    }
}

/// The ticket a run operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRef {
    /// Ticketing system record id; addresses the record for updates.
    pub sys_id: String,
    /// Human ticket number; keys checkpoints and run exclusivity.
    pub number: String,
    /// Record class (table) the ticket lives in.
    pub table: String,
    /// Classification string used to pick the flow.
    pub classification: String,
    /// Last state code known to have been written.
    pub state_code: Option<i16>,
    /// Work notes pushed during the run, in order.
    #[serde(default)]
    pub notes: Vec<String>,
    /// The full inbound payload, handed to scripts that take ticket context.
    pub context: Value,
}

impl TicketRef {
    /// Build a ticket reference from a validated inbound payload.
    ///
    /// Returns `None` when the payload carries no records.
    pub fn from_payload(payload: &TicketPayload) -> Option<Self> {
        let record = payload.result.first()?;
        let state_code = record
            .extra
            .get("state")
            .and_then(|v| match v {
                Value::String(s) => s.trim().parse().ok(),
                Value::Number(n) => n.as_i64().and_then(|n| i16::try_from(n).ok()),
                _ => None,
            });
        Some(Self {
            sys_id: record.sys_id.clone(),
            number: record.number.clone(),
            table: record
                .sys_class_name
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_TICKET_TABLE.to_string()),
            classification: record.short_description.clone(),
            state_code,
            notes: Vec::new(),
            context: serde_json::to_value(payload).unwrap_or(Value::Null),
        })
    }
}

/// Inbound ticket payload: `{"result": [ { ...ticket fields... } ]}`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TicketPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "result must contain at least one record"), nested)]
    pub result: Vec<TaskRecord>,
}

/// A ticket record. Only the fields the engine needs are typed; everything
/// else is preserved in `extra` and passed through to scripts.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaskRecord {
    #[serde(default)]
    #[validate(length(min = 1, message = "sys_id is required"))]
    pub sys_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "number is required"))]
    pub number: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "short_description is required"))]
    pub short_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sys_class_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Updates pushed to the external ticket record.
///
/// Every call either succeeds or returns [`CoreError::SyncFailed`]; the
/// state machine treats a failure as fatal for the transition. Retrying
/// transient failures is the implementation's concern.
#[async_trait]
pub trait TicketSync: Send + Sync {
    /// Write the ticket state code.
    async fn set_status(&self, ticket: &TicketRef, state: TicketState) -> Result<(), CoreError>;

    /// Append a work note.
    async fn append_note(&self, ticket: &TicketRef, text: &str) -> Result<(), CoreError>;

    /// Move the ticket to another assignment group.
    async fn reassign(&self, ticket: &TicketRef, group: &str) -> Result<(), CoreError>;
}
