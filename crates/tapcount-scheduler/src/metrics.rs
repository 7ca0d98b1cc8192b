// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outcome counters and the periodic metrics reporter.
//!
//! Counters are plain atomics owned by the scheduler. The reporter samples
//! them together with queue depth, logs a one-line summary and, with the
//! `prometheus` feature, mirrors everything to the metrics facade. It never
//! mutates scheduling state.

use std::ops::Sub;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use strum::{Display, IntoStaticStr};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tapcount_config::model::BackpressureConfig;
use tapcount_core::Tier;

use crate::pause::TierPauseState;
use crate::queue::{DispatchQueue, QueueCounts};

/// Monotonic per-outcome counters.
#[derive(Debug, Default)]
pub struct OutcomeCounters {
    success: AtomicU64,
    skipped: AtomicU64,
    invalid_session: AtomicU64,
    rate_limited: AtomicU64,
    other_errors: AtomicU64,
    paused: AtomicU64,
}

/// The outcome classes a processed job is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    Success,
    Skipped,
    InvalidSession,
    RateLimited,
    OtherError,
    Paused,
}

impl OutcomeCounters {
    pub fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Success => &self.success,
            Outcome::Skipped => &self.skipped,
            Outcome::InvalidSession => &self.invalid_session,
            Outcome::RateLimited => &self.rate_limited,
            Outcome::OtherError => &self.other_errors,
            Outcome::Paused => &self.paused,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "prometheus")]
        tapcount_prometheus::record_update(outcome.into());
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            success: self.success.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            invalid_session: self.invalid_session.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            other_errors: self.other_errors.load(Ordering::Relaxed),
            paused: self.paused.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`OutcomeCounters`]. Subtracting two snapshots
/// gives the per-interval delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub success: u64,
    pub skipped: u64,
    pub invalid_session: u64,
    pub rate_limited: u64,
    pub other_errors: u64,
    pub paused: u64,
}

impl Sub for CounterSnapshot {
    type Output = CounterSnapshot;

    fn sub(self, earlier: Self) -> Self::Output {
        CounterSnapshot {
            success: self.success.saturating_sub(earlier.success),
            skipped: self.skipped.saturating_sub(earlier.skipped),
            invalid_session: self.invalid_session.saturating_sub(earlier.invalid_session),
            rate_limited: self.rate_limited.saturating_sub(earlier.rate_limited),
            other_errors: self.other_errors.saturating_sub(earlier.other_errors),
            paused: self.paused.saturating_sub(earlier.paused),
        }
    }
}

/// Operator-facing load classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LoadStatus {
    Normal,
    High,
    Overload,
}

/// Same thresholds the backpressure controller pauses on.
pub fn load_status(pending: usize, config: &BackpressureConfig) -> LoadStatus {
    if pending > config.high_threshold {
        LoadStatus::Overload
    } else if pending > config.medium_threshold {
        LoadStatus::High
    } else {
        LoadStatus::Normal
    }
}

/// One reporter sample.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub status: LoadStatus,
    pub queue: QueueCounts,
    /// Successful dispatches per second since the previous sample.
    pub throughput: f64,
    pub delta: CounterSnapshot,
    pub medium_paused: bool,
    pub low_paused: bool,
}

/// Periodically samples queue depth and outcome counters.
pub struct MetricsReporter {
    queue: Arc<DispatchQueue>,
    counters: Arc<OutcomeCounters>,
    pauses: Arc<TierPauseState>,
    thresholds: BackpressureConfig,
    last: Mutex<(Instant, CounterSnapshot)>,
}

impl MetricsReporter {
    pub fn new(
        queue: Arc<DispatchQueue>,
        counters: Arc<OutcomeCounters>,
        pauses: Arc<TierPauseState>,
        thresholds: BackpressureConfig,
    ) -> Self {
        let baseline = counters.snapshot();
        Self {
            queue,
            counters,
            pauses,
            thresholds,
            last: Mutex::new((Instant::now(), baseline)),
        }
    }

    /// Take a sample and advance the delta baseline.
    pub async fn sample(&self) -> MetricsReport {
        let queue = self.queue.counts().await;
        let now_counters = self.counters.snapshot();

        let mut last = self.last.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(last.0).as_secs_f64();
        let delta = now_counters - last.1;
        *last = (now, now_counters);
        drop(last);

        let throughput = if elapsed > 0.0 {
            delta.success as f64 / elapsed
        } else {
            0.0
        };

        let report = MetricsReport {
            status: load_status(queue.pending(), &self.thresholds),
            queue,
            throughput,
            delta,
            medium_paused: self.pauses.is_paused(Tier::Medium),
            low_paused: self.pauses.is_paused(Tier::Low),
        };
        self.export(&report);
        report
    }

    #[cfg(feature = "prometheus")]
    fn export(&self, report: &MetricsReport) {
        tapcount_prometheus::set_queue_depth("delayed", report.queue.delayed);
        tapcount_prometheus::set_queue_depth("waiting", report.queue.waiting);
        tapcount_prometheus::set_queue_depth("active", report.queue.active);
        tapcount_prometheus::set_throughput(report.throughput);
        tapcount_prometheus::set_tier_paused("medium", report.medium_paused);
        tapcount_prometheus::set_tier_paused("low", report.low_paused);
    }

    #[cfg(not(feature = "prometheus"))]
    fn export(&self, _report: &MetricsReport) {}

    /// Sample every `interval` until cancelled.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let r = self.sample().await;
                    info!(
                        status = %r.status,
                        medium_paused = r.medium_paused,
                        low_paused = r.low_paused,
                        "{} Queue: {}W {}A {}D {}F | Rate: {}/s | Success: {} | Skipped: {} | 429: {}",
                        r.status,
                        r.queue.waiting,
                        r.queue.active,
                        r.queue.delayed,
                        r.queue.failed,
                        r.throughput.round(),
                        r.delta.success,
                        r.delta.skipped,
                        r.delta.rate_limited,
                    );
                }
                _ = cancel.cancelled() => {
                    info!("metrics reporter shutting down");
                    break;
                }
            }
        }
    }
}
