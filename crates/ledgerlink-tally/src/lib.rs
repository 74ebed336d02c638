// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tally protocol support: XML envelope builders, response parsers, and the
//! transport-selecting client.

pub mod client;
pub mod response;
pub mod xml;

pub use client::TallyClient;
pub use response::{ConnectionProbe, ImportOutcome, StockItem};
