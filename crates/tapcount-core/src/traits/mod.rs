// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the scheduler's external collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod stats;
pub mod store;
pub mod transport;

pub use adapter::PluginAdapter;
pub use stats::StatsSource;
pub use store::SessionStore;
pub use transport::MessageTransport;
