// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ledgerlink sync bridge.

use thiserror::Error;

/// The primary error type used across all Ledgerlink crates.
#[derive(Debug, Error)]
pub enum LedgerlinkError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Relay or commerce authentication failed. Fatal per attempt — the
    /// caller must re-authenticate, no automatic retry.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// No route to the target: no relay session, or the direct socket was
    /// refused/reset.
    #[error("connection unavailable: {message}")]
    ConnectionUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Deadline elapsed before a response arrived.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The peer answered, but the payload was malformed or semantically
    /// unexpected.
    #[error("protocol error: {message}")]
    Protocol {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Caller-supplied data is missing a required mapped field.
    #[error("validation error: {0}")]
    Validation(String),

    /// Commerce platform API failure (non-auth).
    #[error("commerce API error: {message}")]
    Api {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration or run-log store failure.
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerlinkError {
    /// Shorthand for a sourceless [`LedgerlinkError::ConnectionUnavailable`].
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::ConnectionUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a sourceless [`LedgerlinkError::Protocol`].
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            source: None,
        }
    }
}
