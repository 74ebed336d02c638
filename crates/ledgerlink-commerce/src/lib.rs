// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commerce platform API client for the Ledgerlink sync bridge.

pub mod client;

pub use client::{CommerceClient, CommerceProbe};
