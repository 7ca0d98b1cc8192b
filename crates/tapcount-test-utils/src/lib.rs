// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for tapcount integration tests.
//!
//! Provides mock collaborators and a harness for fast, deterministic,
//! CI-runnable tests without a bot token or a stats API.
//!
//! # Components
//!
//! - [`MockTransport`] - Captures edits and replays scripted failures
//! - [`MockStats`] - Per-user render data with scripted failures
//! - [`MemorySessionStore`] - In-memory [`SessionStore`](tapcount_core::SessionStore)
//! - [`TestHarness`] - An [`UpdateScheduler`](tapcount_scheduler::UpdateScheduler) wired to the mocks

pub mod harness;
pub mod memory_store;
pub mod mock_stats;
pub mod mock_transport;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory_store::MemorySessionStore;
pub use mock_stats::MockStats;
pub use mock_transport::MockTransport;
