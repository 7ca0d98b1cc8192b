// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic re-derivation of every session's tier.
//!
//! Sessions with no fresh activity still need refreshing because other
//! users move the global counter and the leaderboard. Sessions whose
//! heartbeat is older than the eviction ceiling are deleted instead.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tapcount_core::{SessionStore, TapcountError, UpdateJob};

use crate::dedup::DedupCache;
use crate::queue::DispatchQueue;

/// What one pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResyncSummary {
    pub enqueued: usize,
    pub evicted: usize,
}

pub struct ResyncLoop {
    store: Arc<dyn SessionStore>,
    queue: Arc<DispatchQueue>,
    dedup: Arc<DedupCache>,
    eviction: Duration,
}

impl ResyncLoop {
    pub fn new(
        store: Arc<dyn SessionStore>,
        queue: Arc<DispatchQueue>,
        dedup: Arc<DedupCache>,
        eviction: Duration,
    ) -> Self {
        Self {
            store,
            queue,
            dedup,
            eviction,
        }
    }

    /// One pass at wall-clock now.
    pub async fn sync_once(&self) -> Result<ResyncSummary, TapcountError> {
        self.sync_at(chrono::Utc::now().timestamp_millis()).await
    }

    /// One pass as of `now_ms`.
    pub async fn sync_at(&self, now_ms: i64) -> Result<ResyncSummary, TapcountError> {
        let eviction_ms = i64::try_from(self.eviction.as_millis()).unwrap_or(i64::MAX);
        let policy = *self.queue.policy();
        let mut summary = ResyncSummary::default();

        for record in self.store.list().await? {
            if now_ms.saturating_sub(record.last_heartbeat_ms) > eviction_ms {
                if let Err(e) = self.store.remove(record.key).await {
                    warn!(session = %record.key, error = %e, "failed to evict inactive session");
                    continue;
                }
                self.dedup.evict(record.key);
                summary.evicted += 1;
                debug!(session = %record.key, "evicted inactive session");
                continue;
            }
            let tier = policy.classify(now_ms, record.last_click_ms, record.last_heartbeat_ms);
            self.queue.enqueue(UpdateJob::from(&record), tier).await;
            summary.enqueued += 1;
        }
        Ok(summary)
    }

    /// Run a pass immediately, then every `interval` until cancelled.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sync_once().await {
                        Ok(summary) => info!(
                            enqueued = summary.enqueued,
                            evicted = summary.evicted,
                            "session resync complete"
                        ),
                        Err(e) => error!(error = %e, "session resync failed"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("session resync shutting down");
                    break;
                }
            }
        }
    }
}
