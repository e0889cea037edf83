//! Table API client for ticket updates.
//!
//! Every sync operation is a `PUT {base}/api/now/table/{table}/{sys_id}`
//! with a one-field JSON body, authenticated with basic auth.

use async_trait::async_trait;
use remedy_core::error::CoreError;
use remedy_core::ticket::{TicketRef, TicketState, TicketSync};
use serde_json::{json, Value};

use crate::config::TicketingConfig;
use crate::retry::next_delay;

/// Errors from the ticketing API layer.
#[derive(Debug, thiserror::Error)]
pub enum TicketingError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("Ticketing API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    #[error("Ticketing configuration error: {0}")]
    Config(String),
}

impl TicketingError {
    /// Transport failures and server errors are worth another attempt;
    /// client errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::ApiError { status, .. } => *status >= 500,
            Self::Config(_) => false,
        }
    }

    /// The request never reached the server, so sending it again cannot
    /// apply it twice.
    pub fn is_unsent(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_connect())
    }
}

/// HTTP client for one ticketing instance.
pub struct TableApiClient {
    client: reqwest::Client,
    config: TicketingConfig,
}

impl TableApiClient {
    pub fn new(config: TicketingConfig) -> Result<Self, TicketingError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: TicketingConfig) -> Self {
        Self { client, config }
    }

    pub fn record_url(&self, table: &str, sys_id: &str) -> String {
        format!(
            "{}/api/now/table/{table}/{sys_id}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    // ---- private helpers ----

    /// PUT `fields`, retrying failures accepted by `retryable` up to
    /// `max_retries` times. Returns the API's response body.
    async fn put_with_retry(
        &self,
        url: &str,
        fields: &Value,
        retryable: fn(&TicketingError) -> bool,
    ) -> Result<Value, TicketingError> {
        let mut delay = self.config.retry.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.put_once(url, fields).await {
                Ok(body) => return Ok(body),
                Err(e) if retryable(&e) && attempt <= self.config.max_retries => {
                    tracing::warn!(
                        url = %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Ticket update failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    delay = next_delay(delay, &self.config.retry);
                }
                Err(e) => {
                    tracing::error!(url = %url, attempt, error = %e, "Ticket update failed");
                    return Err(e);
                }
            }
        }
    }

    async fn put_once(&self, url: &str, fields: &Value) -> Result<Value, TicketingError> {
        let response = self
            .client
            .put(url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(fields)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`TicketingError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, TicketingError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TicketingError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Check the status, then read the body as JSON. An empty body reads
    /// as `null`.
    async fn parse_response(response: reqwest::Response) -> Result<Value, TicketingError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    async fn sync(
        &self,
        ticket: &TicketRef,
        action: &str,
        fields: Value,
        retryable: fn(&TicketingError) -> bool,
    ) -> Result<(), CoreError> {
        tracing::debug!(ticket = %ticket.number, action, "Syncing ticket");
        let url = self.record_url(&ticket.table, &ticket.sys_id);
        self.put_with_retry(&url, &fields, retryable)
            .await
            .map(|_| ())
            .map_err(|e| CoreError::SyncFailed(format!("{action} on {}: {e}", ticket.number)))
    }
}

#[async_trait]
impl TicketSync for TableApiClient {
    async fn set_status(&self, ticket: &TicketRef, state: TicketState) -> Result<(), CoreError> {
        self.sync(
            ticket,
            "set status",
            json!({ "state": state.code().to_string() }),
            TicketingError::is_retryable,
        )
        .await
    }

    /// Every accepted `work_notes` write adds a journal entry. A timeout or
    /// 5xx may arrive after the entry was stored, so only connect failures
    /// are retried.
    async fn append_note(&self, ticket: &TicketRef, text: &str) -> Result<(), CoreError> {
        self.sync(
            ticket,
            "append note",
            json!({ "work_notes": text }),
            TicketingError::is_unsent,
        )
        .await
    }

    async fn reassign(&self, ticket: &TicketRef, group: &str) -> Result<(), CoreError> {
        self.sync(
            ticket,
            "reassign",
            json!({ "assignment_group": group }),
            TicketingError::is_retryable,
        )
        .await
    }
}
