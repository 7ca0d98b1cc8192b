// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound HTTP surface for the update scheduler.
//!
//! The mini app and the bot front end talk to the scheduler through this
//! gateway: session registration, heartbeats, session end, click activity
//! and queue status. `/health` and `/metrics` are public; everything under
//! `/v1` sits behind bearer auth when a token is configured.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{router, start_server, GatewayState, HealthState, ServerConfig};
