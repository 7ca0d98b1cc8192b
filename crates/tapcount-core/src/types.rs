// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the scheduler and its collaborators.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Identity of one live session: a user viewing the counter in one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub user_id: i64,
    pub chat_id: i64,
}

impl SessionKey {
    pub fn new(user_id: i64, chat_id: i64) -> Self {
        Self { user_id, chat_id }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.chat_id)
    }
}

/// Priority class of an update.
///
/// Variants are declared lowest first so the derived `Ord` gives
/// `High > Medium > Low`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    /// Tiers in dispatch preference order.
    pub const BY_PRIORITY: [Tier; 3] = [Tier::High, Tier::Medium, Tier::Low];

    /// Whether backpressure may pause this tier. `High` is never paused.
    pub fn is_pausable(self) -> bool {
        !matches!(self, Tier::High)
    }
}

/// A session as held by the session store.
///
/// Timestamps are Unix epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub key: SessionKey,
    pub message_id: i32,
    pub last_click_ms: Option<i64>,
    pub last_heartbeat_ms: i64,
}

/// Everything a worker needs to refresh one session's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateJob {
    pub key: SessionKey,
    pub message_id: i32,
    pub last_click_ms: Option<i64>,
    pub last_heartbeat_ms: i64,
}

impl From<&SessionRecord> for UpdateJob {
    fn from(record: &SessionRecord) -> Self {
        Self {
            key: record.key,
            message_id: record.message_id,
            last_click_ms: record.last_click_ms,
            last_heartbeat_ms: record.last_heartbeat_ms,
        }
    }
}

/// Per-user statistics returned by the render-data API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub username: String,
    pub clicks: u64,
}

/// Global counters returned by the render-data API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_clicks: u64,
    #[serde(default)]
    pub total_users: u64,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub clicks: u64,
}

/// Render inputs for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStats {
    pub user_stats: UserStats,
    pub global_stats: GlobalStats,
    #[serde(default)]
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// A single edit-in-place request handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub chat_id: i64,
    pub message_id: i32,
    pub content: String,
}

/// Classified failure of a dispatch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchFailure {
    /// The platform asked us to slow down.
    RateLimited { retry_after: Option<Duration> },
    /// The platform reports the content is identical to what is shown.
    Unmodified,
    /// The target message no longer exists.
    TargetGone,
    /// Anything else.
    Other(String),
}

impl DispatchFailure {
    /// Unmodified and gone targets are terminal: retrying cannot help.
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, DispatchFailure::Unmodified | DispatchFailure::TargetGone)
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchFailure::RateLimited { retry_after: Some(d) } => {
                write!(f, "rate limited (retry after {}s)", d.as_secs())
            }
            DispatchFailure::RateLimited { retry_after: None } => write!(f, "rate limited"),
            DispatchFailure::Unmodified => write!(f, "message is not modified"),
            DispatchFailure::TargetGone => write!(f, "message to edit not found"),
            DispatchFailure::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DispatchFailure {}

/// Failure of a render-data fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// The user is unknown to the stats API. Non-retryable.
    NotFound,
    /// The API could not be reached or returned garbage.
    Unavailable(String),
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::NotFound => write!(f, "user not found"),
            StatsError::Unavailable(msg) => write!(f, "stats unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StatsError {}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Stats,
    SessionStore,
    Observability,
}
