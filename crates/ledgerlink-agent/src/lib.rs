// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridge agent for the Ledgerlink relay.
//!
//! Runs next to the Tally engine, maintains the outbound relay connection,
//! and executes proxied XML requests against the local endpoint.

pub mod bridge;
pub mod delivery;

pub use bridge::{Bridge, BridgeSettings, BridgeState};
pub use delivery::LocalDelivery;
