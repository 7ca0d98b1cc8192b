// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue-depth driven tier pausing.
//!
//! Only the pause primitive lives here; expiry is handled by
//! [`TierPauseState`] itself.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tapcount_config::model::BackpressureConfig;
use tapcount_core::Tier;

use crate::pause::TierPauseState;
use crate::queue::DispatchQueue;

pub struct BackpressureController {
    queue: Arc<DispatchQueue>,
    pauses: Arc<TierPauseState>,
    config: BackpressureConfig,
}

impl BackpressureController {
    pub fn new(
        queue: Arc<DispatchQueue>,
        pauses: Arc<TierPauseState>,
        config: BackpressureConfig,
    ) -> Self {
        Self {
            queue,
            pauses,
            config,
        }
    }

    /// Inspect the backlog once and pause at most one tier.
    ///
    /// Above the high threshold LOW is paused first; if LOW is already
    /// paused the check falls through to MEDIUM. Returns the tier this call
    /// paused, if any.
    pub async fn check(&self) -> Option<Tier> {
        let pending = self.queue.counts().await.pending();
        let low_paused = self.pauses.is_paused(Tier::Low);

        let (tier, pause_for) = if pending > self.config.high_threshold && !low_paused {
            (Tier::Low, Duration::from_secs(self.config.low_pause_secs))
        } else if pending > self.config.medium_threshold && !self.pauses.is_paused(Tier::Medium)
        {
            (Tier::Medium, Duration::from_secs(self.config.medium_pause_secs))
        } else {
            debug!(pending, "backpressure check: no action");
            return None;
        };

        if !self.pauses.pause(tier, pause_for) {
            return None;
        }
        info!(
            pending,
            tier = %tier,
            pause_secs = pause_for.as_secs(),
            "backpressure: pausing tier"
        );
        Some(tier)
    }

    /// Check every `interval` until cancelled.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check().await;
                }
                _ = cancel.cancelled() => {
                    info!("backpressure controller shutting down");
                    break;
                }
            }
        }
    }
}
