//! At most one active run per ticket.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// Registry of tickets with a run in flight.
#[derive(Debug, Default)]
pub struct ActiveRuns {
    tickets: Mutex<HashSet<String>>,
}

impl ActiveRuns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `ticket`. Returns `None` if a run already holds it.
    ///
    /// The claim is released when the returned guard drops, whether the
    /// run finished, failed, or its task was cancelled.
    pub fn try_acquire(&self, ticket: &str) -> Option<RunGuard<'_>> {
        if !self.lock().insert(ticket.to_string()) {
            return None;
        }
        Some(RunGuard {
            runs: self,
            ticket: ticket.to_string(),
        })
    }

    pub fn is_active(&self, ticket: &str) -> bool {
        self.lock().contains(ticket)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The set stays consistent even if a holder panicked, so poisoning is
    // ignored.
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.tickets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Exclusive claim on one ticket.
#[derive(Debug)]
pub struct RunGuard<'a> {
    runs: &'a ActiveRuns,
    ticket: String,
}

impl RunGuard<'_> {
    pub fn ticket(&self) -> &str {
        &self.ticket
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.runs.lock().remove(&self.ticket);
    }
}
