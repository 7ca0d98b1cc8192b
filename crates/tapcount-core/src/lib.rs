// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the tapcount update scheduler.
//!
//! Provides the error type, the domain types that flow between the
//! scheduler and its collaborators, and the adapter traits those
//! collaborators implement.

pub mod error;
pub mod traits;
pub mod types;

pub use error::TapcountError;
pub use types::{
    AdapterType, DispatchFailure, DispatchRequest, HealthStatus, RenderStats, SessionKey,
    SessionRecord, StatsError, Tier, UpdateJob,
};

pub use traits::{MessageTransport, PluginAdapter, SessionStore, StatsSource};
