// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single active relay session.

use std::sync::Mutex;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ledgerlink_core::{LedgerlinkError, RelayFrame};

/// Instruction for the per-connection sender task.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    /// Serialize and send a frame.
    Frame(RelayFrame),
    /// Send a close frame with the given code/reason, then stop.
    Close(u16, &'static str),
}

/// Handle to one authenticated bridge connection.
///
/// At most one session exists at a time; the holder swaps it atomically on
/// supersession. The cancellation token fires when a newer connection
/// displaces this one.
pub struct Session {
    id: String,
    outbound: mpsc::Sender<SessionCommand>,
    superseded: CancellationToken,
    /// Instant of the last inbound frame, for keepalive liveness.
    last_rx: Mutex<Instant>,
}

impl Session {
    pub(crate) fn new(id: String, outbound: mpsc::Sender<SessionCommand>) -> Self {
        Self {
            id,
            outbound,
            superseded: CancellationToken::new(),
            last_rx: Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn superseded(&self) -> &CancellationToken {
        &self.superseded
    }

    /// Mark this session as displaced by a newer connection.
    pub(crate) fn supersede(&self) {
        self.superseded.cancel();
    }

    /// Queue a frame for the socket. Fails when the connection task has
    /// already gone away.
    pub(crate) async fn send_frame(&self, frame: RelayFrame) -> Result<(), LedgerlinkError> {
        self.outbound
            .send(SessionCommand::Frame(frame))
            .await
            .map_err(|_| LedgerlinkError::unavailable("relay session closed while sending"))
    }

    /// Queue a close frame.
    pub(crate) async fn send_close(&self, code: u16, reason: &'static str) {
        let _ = self.outbound.send(SessionCommand::Close(code, reason)).await;
    }

    /// Record inbound traffic for liveness tracking.
    pub(crate) fn mark_traffic(&self) {
        if let Ok(mut at) = self.last_rx.lock() {
            *at = Instant::now();
        }
    }

    /// Time since the last inbound frame.
    pub(crate) fn idle_for(&self) -> std::time::Duration {
        self.last_rx
            .lock()
            .map(|at| at.elapsed())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("superseded", &self.superseded.is_cancelled())
            .finish()
    }
}
