//! Ticketing system adapter.
//!
//! [`TableApiClient`] implements [`remedy_core::ticket::TicketSync`] against
//! a ServiceNow-style Table API, with retry and backoff for transient
//! failures.

pub mod client;
pub mod config;
pub mod retry;

pub use client::{TableApiClient, TicketingError};
pub use config::TicketingConfig;
pub use retry::RetryConfig;
