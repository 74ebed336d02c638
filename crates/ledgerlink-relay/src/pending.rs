// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Correlation map for in-flight proxied requests.
//!
//! Each entry pairs a generated correlation id with the oneshot waiter of
//! the caller that issued the request. Entries are removed on resolution,
//! rejection, caller-side timeout, or session teardown — every id sees
//! exactly one terminal outcome and the map never leaks.

use dashmap::DashMap;
use tokio::sync::oneshot;

use ledgerlink_core::LedgerlinkError;

type Waiter = oneshot::Sender<Result<String, LedgerlinkError>>;

/// In-flight request registry keyed by correlation id.
#[derive(Debug, Default)]
pub struct PendingRequests {
    waiters: DashMap<String, Waiter>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new correlation id and return the receiving half the
    /// caller awaits on.
    pub fn register(&self, id: String) -> oneshot::Receiver<Result<String, LedgerlinkError>> {
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(id, tx);
        rx
    }

    /// Resolve a pending request with the raw response payload.
    ///
    /// Returns `false` when the id is unknown (already resolved, timed
    /// out, or never registered).
    pub fn resolve(&self, id: &str, xml: String) -> bool {
        match self.waiters.remove(id) {
            Some((_, tx)) => tx.send(Ok(xml)).is_ok(),
            None => false,
        }
    }

    /// Reject a pending request with an error.
    pub fn reject(&self, id: &str, error: LedgerlinkError) -> bool {
        match self.waiters.remove(id) {
            Some((_, tx)) => tx.send(Err(error)).is_ok(),
            None => false,
        }
    }

    /// Remove an entry without notifying the waiter (caller gave up, e.g.
    /// on deadline).
    pub fn discard(&self, id: &str) {
        self.waiters.remove(id);
    }

    /// Reject every outstanding entry. Called on session teardown so no
    /// caller hangs past its own deadline.
    pub fn reject_all(&self, message: &str) {
        let ids: Vec<String> = self.waiters.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, tx)) = self.waiters.remove(&id) {
                let _ = tx.send(Err(LedgerlinkError::unavailable(message)));
            }
        }
    }

    /// Number of in-flight requests.
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
