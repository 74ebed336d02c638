// SPDX-FileCopyrightText: 2026 Ledgerlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cron trigger registry for the Ledgerlink sync bridge.

pub mod scheduler;

pub use scheduler::Scheduler;
