// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`UpdateScheduler`] facade.
//!
//! Owns every shared piece of scheduling state and every background task.
//! Inbound surfaces (the gateway, tests) talk to the scheduler only through
//! this type.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use tapcount_config::model::{BackpressureConfig, TapcountConfig};
use tapcount_core::{
    MessageTransport, SessionKey, SessionRecord, SessionStore, StatsSource, TapcountError, Tier,
    UpdateJob,
};

use crate::backpressure::BackpressureController;
use crate::classifier::TierPolicy;
use crate::click::{ActivityEvent, ClickSubscriber};
use crate::dedup::DedupCache;
use crate::metrics::{load_status, LoadStatus, MetricsReporter, OutcomeCounters};
use crate::pause::TierPauseState;
use crate::queue::{DispatchQueue, QueueCounts};
use crate::rate_limit::RateLimiter;
use crate::resync::ResyncLoop;
use crate::retry::{RetryPolicy, RetryingQueue};
use crate::worker::{UpdateWorker, WorkerPool};

/// Buffered activity events before senders start waiting.
const ACTIVITY_CHANNEL_CAPACITY: usize = 1024;

/// Point-in-time view for operators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SchedulerStatus {
    pub status: LoadStatus,
    pub queue: QueueCounts,
    pub medium_paused: bool,
    pub low_paused: bool,
    /// Seconds until MEDIUM resumes, rounded up.
    pub medium_resumes_in_secs: Option<u64>,
    pub low_resumes_in_secs: Option<u64>,
}

struct Intervals {
    backpressure: Duration,
    resync: Duration,
    metrics: Duration,
}

pub struct UpdateScheduler {
    store: Arc<dyn SessionStore>,
    dispatch: Arc<DispatchQueue>,
    queue: Arc<RetryingQueue>,
    pauses: Arc<TierPauseState>,
    dedup: Arc<DedupCache>,
    counters: Arc<OutcomeCounters>,
    worker: Arc<UpdateWorker>,
    backpressure: Arc<BackpressureController>,
    resync: Arc<ResyncLoop>,
    reporter: Arc<MetricsReporter>,
    concurrency: usize,
    intervals: Intervals,
    thresholds: BackpressureConfig,
    activity_tx: mpsc::Sender<ActivityEvent>,
    activity_rx: Mutex<Option<mpsc::Receiver<ActivityEvent>>>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl UpdateScheduler {
    pub fn new(
        config: &TapcountConfig,
        store: Arc<dyn SessionStore>,
        stats: Arc<dyn StatsSource>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        let dispatch = Arc::new(DispatchQueue::new(TierPolicy::from_config(&config.tiers)));
        let queue = Arc::new(RetryingQueue::new(
            dispatch.clone(),
            RetryPolicy::from_config(&config.worker),
        ));
        let pauses = Arc::new(TierPauseState::new());
        let dedup = Arc::new(DedupCache::new());
        let counters = Arc::new(OutcomeCounters::default());
        let limiter = Arc::new(RateLimiter::per_second(config.worker.rate_limit_per_second));

        let worker = Arc::new(UpdateWorker::new(
            stats,
            transport,
            dedup.clone(),
            pauses.clone(),
            limiter,
            counters.clone(),
        ));
        let backpressure = Arc::new(BackpressureController::new(
            dispatch.clone(),
            pauses.clone(),
            config.backpressure.clone(),
        ));
        let resync = Arc::new(ResyncLoop::new(
            store.clone(),
            dispatch.clone(),
            dedup.clone(),
            Duration::from_secs(config.resync.eviction_secs),
        ));
        let reporter = Arc::new(MetricsReporter::new(
            dispatch.clone(),
            counters.clone(),
            pauses.clone(),
            config.backpressure.clone(),
        ));
        let (activity_tx, activity_rx) = mpsc::channel(ACTIVITY_CHANNEL_CAPACITY);

        Self {
            store,
            dispatch,
            queue,
            pauses,
            dedup,
            counters,
            worker,
            backpressure,
            resync,
            reporter,
            concurrency: config.worker.concurrency,
            intervals: Intervals {
                backpressure: Duration::from_secs(config.backpressure.check_interval_secs),
                resync: Duration::from_secs(config.resync.interval_secs),
                metrics: Duration::from_secs(config.metrics.report_interval_secs),
            },
            thresholds: config.backpressure.clone(),
            activity_tx,
            activity_rx: Mutex::new(Some(activity_rx)),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the worker pool and every periodic task. Fails if called twice.
    pub fn start(&self) -> Result<(), TapcountError> {
        let activity_rx = self
            .activity_rx
            .lock()
            .map_err(|_| TapcountError::Internal("activity receiver lock poisoned".into()))?
            .take()
            .ok_or_else(|| TapcountError::Internal("scheduler already started".into()))?;

        let pool = WorkerPool::new(self.worker.clone(), self.queue.clone(), self.concurrency);
        self.tracker
            .spawn(pool.run(self.tracker.clone(), self.cancel.clone()));

        let clicks = ClickSubscriber::new(activity_rx, self.store.clone(), self.dispatch.clone());
        self.tracker.spawn(clicks.run(self.cancel.clone()));

        self.tracker.spawn(
            self.backpressure
                .clone()
                .run(self.intervals.backpressure, self.cancel.clone()),
        );
        self.tracker.spawn(
            self.resync
                .clone()
                .run(self.intervals.resync, self.cancel.clone()),
        );
        self.tracker.spawn(
            self.reporter
                .clone()
                .run(self.intervals.metrics, self.cancel.clone()),
        );

        info!(concurrency = self.concurrency, "update scheduler started");
        Ok(())
    }

    /// Cancel every task and wait for them, in-flight jobs included.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("update scheduler stopped");
    }

    /// Token observed by every background task.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Create or refresh a session and enqueue one update for it.
    ///
    /// A fresh registration carries no click and a current heartbeat, so it
    /// lands in MEDIUM under the default windows.
    pub async fn register_session(
        &self,
        key: SessionKey,
        message_id: i32,
    ) -> Result<Tier, TapcountError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let record = SessionRecord {
            key,
            message_id,
            last_click_ms: None,
            last_heartbeat_ms: now_ms,
        };
        self.store.upsert(&record).await?;

        let tier = self
            .dispatch
            .policy()
            .classify(now_ms, record.last_click_ms, record.last_heartbeat_ms);
        self.dispatch.enqueue(UpdateJob::from(&record), tier).await;
        info!(session = %key, message_id, tier = %tier, "session registered");
        Ok(tier)
    }

    /// Refresh a session's heartbeat. Does not enqueue. Returns `false` for
    /// an unknown session.
    pub async fn heartbeat(&self, key: SessionKey) -> Result<bool, TapcountError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.store.touch_heartbeat(key, now_ms).await
    }

    /// Forget a session and the content it last received.
    pub async fn end_session(&self, key: SessionKey) -> Result<bool, TapcountError> {
        let removed = self.store.remove(key).await?;
        self.dedup.evict(key);
        if removed {
            info!(session = %key, "session ended");
        }
        Ok(removed)
    }

    /// Hand an activity event to the click subscriber.
    pub async fn record_activity(&self, event: ActivityEvent) -> Result<(), TapcountError> {
        self.activity_tx
            .send(event)
            .await
            .map_err(|_| TapcountError::Internal("click subscriber is not running".into()))
    }

    pub fn activity_sender(&self) -> mpsc::Sender<ActivityEvent> {
        self.activity_tx.clone()
    }

    pub async fn status(&self) -> SchedulerStatus {
        let queue = self.dispatch.counts().await;
        let medium = self.pauses.paused_for(Tier::Medium);
        let low = self.pauses.paused_for(Tier::Low);
        SchedulerStatus {
            status: load_status(queue.pending(), &self.thresholds),
            queue,
            medium_paused: medium.is_some(),
            low_paused: low.is_some(),
            medium_resumes_in_secs: medium.map(ceil_secs),
            low_resumes_in_secs: low.map(ceil_secs),
        }
    }

    pub fn queue(&self) -> &Arc<RetryingQueue> {
        &self.queue
    }

    pub fn pauses(&self) -> &Arc<TierPauseState> {
        &self.pauses
    }

    pub fn dedup(&self) -> &Arc<DedupCache> {
        &self.dedup
    }

    pub fn counters(&self) -> &Arc<OutcomeCounters> {
        &self.counters
    }

    pub fn backpressure(&self) -> &Arc<BackpressureController> {
        &self.backpressure
    }

    pub fn resync(&self) -> &Arc<ResyncLoop> {
        &self.resync
    }

    pub fn reporter(&self) -> &Arc<MetricsReporter> {
        &self.reporter
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}
