// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay wire protocol: the JSON frames exchanged between the cloud relay
//! and the on-premise bridge agent over the duplex WebSocket.
//!
//! Cloud -> agent: `{"type":"ping"}` and `{"id","type":"request","xml"}`.
//! Agent -> cloud: `{"type":"pong"}`, `{"id","type":"response","xml"}`,
//! `{"id","type":"error","error"}`.

use serde::{Deserialize, Serialize};

/// Close code sent when the handshake carries a missing or mismatched
/// bridge key.
pub const CLOSE_UNAUTHORIZED: u16 = 4001;

/// Close code sent to a session displaced by a newer authenticated
/// connection.
pub const CLOSE_SUPERSEDED: u16 = 4002;

/// A single frame on the relay channel.
///
/// Request/response/error frames carry a correlation id pairing a proxied
/// request with its eventual resolution; ping/pong carry none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayFrame {
    /// Cloud-side keepalive probe.
    Ping,
    /// Agent acknowledgment of a ping.
    Pong,
    /// Proxied Tally request: deliver `xml` to the local engine.
    Request { id: String, xml: String },
    /// Successful local delivery: `xml` is the raw engine response.
    Response { id: String, xml: String },
    /// Local delivery failed; `error` is the failure text.
    Error { id: String, error: String },
}

impl RelayFrame {
    /// The correlation id, for frames that carry one.
    pub fn id(&self) -> Option<&str> {
        match self {
            RelayFrame::Request { id, .. }
            | RelayFrame::Response { id, .. }
            | RelayFrame::Error { id, .. } => Some(id),
            RelayFrame::Ping | RelayFrame::Pong => None,
        }
    }
}
