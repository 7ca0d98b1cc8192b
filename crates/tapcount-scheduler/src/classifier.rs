// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Priority classification.
//!
//! Maps activity recency to a [`Tier`] and each tier to its admission delay.
//! Pure: callers pass the current time in epoch milliseconds.

use std::time::Duration;

use tapcount_config::model::TierConfig;
use tapcount_core::Tier;

/// Windows and delays that drive classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    pub high_click_window: Duration,
    pub medium_heartbeat_window: Duration,
    pub high_delay: Duration,
    pub medium_delay: Duration,
    pub low_delay: Duration,
}

impl TierPolicy {
    pub fn from_config(config: &TierConfig) -> Self {
        Self {
            high_click_window: Duration::from_secs(config.high_click_window_secs),
            medium_heartbeat_window: Duration::from_secs(config.medium_heartbeat_window_secs),
            high_delay: config.high_delay(),
            medium_delay: config.medium_delay(),
            low_delay: config.low_delay(),
        }
    }

    /// Classify a session. First match wins:
    /// a click inside the HIGH window, then a heartbeat inside the MEDIUM
    /// window, otherwise LOW (however stale).
    pub fn classify(&self, now_ms: i64, last_click_ms: Option<i64>, last_heartbeat_ms: i64) -> Tier {
        if let Some(click) = last_click_ms
            && age(now_ms, click) < self.high_click_window
        {
            return Tier::High;
        }
        if age(now_ms, last_heartbeat_ms) < self.medium_heartbeat_window {
            return Tier::Medium;
        }
        Tier::Low
    }

    /// Admission delay for a tier.
    pub fn delay(&self, tier: Tier) -> Duration {
        match tier {
            Tier::High => self.high_delay,
            Tier::Medium => self.medium_delay,
            Tier::Low => self.low_delay,
        }
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::from_config(&TierConfig::default())
    }
}

/// Elapsed time since `then_ms`. Timestamps from the future count as zero.
fn age(now_ms: i64, then_ms: i64) -> Duration {
    Duration::from_millis(u64::try_from(now_ms.saturating_sub(then_ms)).unwrap_or(0))
}
