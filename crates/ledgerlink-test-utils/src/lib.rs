// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory collaborator implementations for tests.

pub mod fake_relay;
pub mod memory_store;

pub use fake_relay::FakeRelay;
pub use memory_store::{MemoryConfigStore, MemoryRunLog};
