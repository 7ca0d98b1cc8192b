// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store trait.

use async_trait::async_trait;

use crate::error::TapcountError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{SessionKey, SessionRecord};

/// Source of truth for live sessions.
///
/// Implementations expire sessions that have not been written for their TTL;
/// expired sessions are never returned.
#[async_trait]
pub trait SessionStore: PluginAdapter {
    /// Creates or replaces a session, refreshing its TTL.
    async fn upsert(&self, record: &SessionRecord) -> Result<(), TapcountError>;

    /// Fetches a live session.
    async fn get(&self, key: SessionKey) -> Result<Option<SessionRecord>, TapcountError>;

    /// Records a heartbeat. Returns `false` if the session is unknown.
    async fn touch_heartbeat(&self, key: SessionKey, at_ms: i64) -> Result<bool, TapcountError>;

    /// Records a click. Returns `false` if the session is unknown.
    async fn touch_click(&self, key: SessionKey, at_ms: i64) -> Result<bool, TapcountError>;

    /// Lists every live session.
    async fn list(&self) -> Result<Vec<SessionRecord>, TapcountError>;

    /// Deletes a session. Returns `false` if it did not exist.
    async fn remove(&self, key: SessionKey) -> Result<bool, TapcountError>;
}
