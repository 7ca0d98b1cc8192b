// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job execution and the bounded worker pool.
//!
//! [`UpdateWorker::process`] runs one job: pause check, rate permit, stats
//! fetch, render, dedup, dispatch. Its result is a closed classification
//! that the [`RetryingQueue`] turns into complete, retry or drop.
//!
//! [`WorkerPool`] drains the queue under two caps at once: a semaphore for
//! concurrency and the shared [`RateLimiter`] for aggregate rate.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use tapcount_core::{
    DispatchFailure, DispatchRequest, MessageTransport, StatsError, StatsSource, Tier, UpdateJob,
};

use crate::dedup::DedupCache;
use crate::metrics::{Outcome, OutcomeCounters};
use crate::pause::TierPauseState;
use crate::rate_limit::RateLimiter;
use crate::render::render_counter_message;
use crate::retry::RetryingQueue;

/// A job that finished without needing a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The message was edited.
    Dispatched,
    /// Rendered content matched what the session already shows.
    SkippedDuplicate,
    /// The target is gone, unchanged, or the user is unknown.
    InvalidSession,
}

/// A job failure the retry policy may act on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("{tier} tier paused")]
    Paused { tier: Tier, remaining: Duration },
    #[error("rate limited by transport")]
    RateLimited { retry_after: Option<Duration> },
    #[error("dispatch failed: {0}")]
    Transport(String),
    #[error("stats fetch failed: {0}")]
    Fetch(String),
}

impl JobError {
    /// Minimum wait before the next attempt: the server's hint for rate
    /// limits, the rest of the cooldown for a paused tier.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            JobError::RateLimited { retry_after } => *retry_after,
            JobError::Paused { remaining, .. } => Some(*remaining),
            _ => None,
        }
    }
}

/// Everything one job touches.
pub struct UpdateWorker {
    stats: Arc<dyn StatsSource>,
    transport: Arc<dyn MessageTransport>,
    dedup: Arc<DedupCache>,
    pauses: Arc<TierPauseState>,
    limiter: Arc<RateLimiter>,
    counters: Arc<OutcomeCounters>,
}

impl UpdateWorker {
    pub fn new(
        stats: Arc<dyn StatsSource>,
        transport: Arc<dyn MessageTransport>,
        dedup: Arc<DedupCache>,
        pauses: Arc<TierPauseState>,
        limiter: Arc<RateLimiter>,
        counters: Arc<OutcomeCounters>,
    ) -> Self {
        Self {
            stats,
            transport,
            dedup,
            pauses,
            limiter,
            counters,
        }
    }

    /// Run one job to a classified result. Never panics on collaborator
    /// failures; every path increments exactly one counter.
    pub async fn process(&self, job: &UpdateJob, tier: Tier) -> Result<JobOutcome, JobError> {
        if let Some(remaining) = self.pauses.paused_for(tier) {
            self.counters.record(Outcome::Paused);
            return Err(JobError::Paused { tier, remaining });
        }

        self.limiter.acquire().await;

        let stats = match self.stats.fetch(job.key.user_id).await {
            Ok(stats) => stats,
            Err(StatsError::NotFound) => {
                self.counters.record(Outcome::InvalidSession);
                debug!(session = %job.key, "user unknown to stats API, dropping update");
                return Ok(JobOutcome::InvalidSession);
            }
            Err(StatsError::Unavailable(msg)) => {
                self.counters.record(Outcome::OtherError);
                return Err(JobError::Fetch(msg));
            }
        };

        let content = render_counter_message(&stats);
        if self.dedup.is_current(job.key, &content) {
            self.counters.record(Outcome::Skipped);
            return Ok(JobOutcome::SkippedDuplicate);
        }

        let request = DispatchRequest {
            chat_id: job.key.chat_id,
            message_id: job.message_id,
            content: content.clone(),
        };

        match self.transport.edit(request).await {
            Ok(()) => {
                self.dedup.record(job.key, content);
                self.counters.record(Outcome::Success);
                debug!(session = %job.key, tier = %tier, "message updated");
                Ok(JobOutcome::Dispatched)
            }
            Err(DispatchFailure::RateLimited { retry_after }) => {
                self.counters.record(Outcome::RateLimited);
                warn!(session = %job.key, ?retry_after, "rate limit hit");
                Err(JobError::RateLimited { retry_after })
            }
            Err(failure) if failure.is_invalid_session() => {
                self.counters.record(Outcome::InvalidSession);
                debug!(session = %job.key, reason = %failure, "invalid session");
                Ok(JobOutcome::InvalidSession)
            }
            Err(failure) => {
                self.counters.record(Outcome::OtherError);
                Err(JobError::Transport(failure.to_string()))
            }
        }
    }
}

/// Concurrency-bounded consumer of the dispatch queue.
pub struct WorkerPool {
    worker: Arc<UpdateWorker>,
    queue: Arc<RetryingQueue>,
    slots: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(worker: Arc<UpdateWorker>, queue: Arc<RetryingQueue>, concurrency: usize) -> Self {
        Self {
            worker,
            queue,
            slots: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Free worker slots right now.
    pub fn idle_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Pull jobs until cancelled. A job is only taken once a slot is free,
    /// so priority decides what the next free slot runs; running jobs are
    /// never preempted. Jobs are spawned on `tracker` and finish even after
    /// cancellation.
    pub async fn run(self, tracker: TaskTracker, cancel: CancellationToken) {
        info!(slots = self.slots.available_permits(), "worker pool started");
        loop {
            let permit = tokio::select! {
                permit = self.slots.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = cancel.cancelled() => break,
            };

            let queued = tokio::select! {
                queued = self.queue.next() => queued,
                _ = cancel.cancelled() => break,
            };

            let worker = self.worker.clone();
            let queue = self.queue.clone();
            tracker.spawn(async move {
                let result = worker.process(&queued.job, queued.tier).await;
                queue.settle(queued, result).await;
                drop(permit);
            });
        }
        info!("worker pool stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::TierPolicy;
    use crate::queue::DispatchQueue;
    use crate::retry::RetryPolicy;
    use tapcount_core::SessionKey;
    use tapcount_test_utils::{MockStats, MockTransport};

    struct Fixture {
        worker: UpdateWorker,
        stats: Arc<MockStats>,
        transport: Arc<MockTransport>,
        dedup: Arc<DedupCache>,
        pauses: Arc<TierPauseState>,
        counters: Arc<OutcomeCounters>,
    }

    fn fixture() -> Fixture {
        let stats = Arc::new(MockStats::new());
        let transport = Arc::new(MockTransport::new());
        let dedup = Arc::new(DedupCache::new());
        let pauses = Arc::new(TierPauseState::new());
        let counters = Arc::new(OutcomeCounters::default());
        let worker = UpdateWorker::new(
            stats.clone(),
            transport.clone(),
            dedup.clone(),
            pauses.clone(),
            Arc::new(RateLimiter::per_second(1000)),
            counters.clone(),
        );
        Fixture {
            worker,
            stats,
            transport,
            dedup,
            pauses,
            counters,
        }
    }

    fn job(user: i64) -> UpdateJob {
        UpdateJob {
            key: SessionKey::new(user, user + 1000),
            message_id: 77,
            last_click_ms: None,
            last_heartbeat_ms: 0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn successful_dispatch_updates_dedup() {
        let f = fixture();
        let outcome = f.worker.process(&job(1), Tier::Medium).await;

        assert_eq!(outcome, Ok(JobOutcome::Dispatched));
        let sent = f.transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, 1001);
        assert_eq!(sent[0].message_id, 77);
        assert!(f.dedup.is_current(job(1).key, &sent[0].content));
        assert_eq!(f.counters.snapshot().success, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_render_is_dispatched_once() {
        let f = fixture();
        assert_eq!(
            f.worker.process(&job(1), Tier::High).await,
            Ok(JobOutcome::Dispatched)
        );
        assert_eq!(
            f.worker.process(&job(1), Tier::High).await,
            Ok(JobOutcome::SkippedDuplicate)
        );

        assert_eq!(f.transport.attempt_count().await, 1);
        let counts = f.counters.snapshot();
        assert_eq!((counts.success, counts.skipped), (1, 1));

        // New content goes through again.
        f.stats.set_clicks(1, 5).await;
        assert_eq!(
            f.worker.process(&job(1), Tier::High).await,
            Ok(JobOutcome::Dispatched)
        );
        assert_eq!(f.transport.attempt_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_tier_fails_fast_without_collaborators() {
        let f = fixture();
        f.pauses.pause(Tier::Low, Duration::from_secs(120));
        tokio::time::advance(Duration::from_secs(45)).await;

        let err = f.worker.process(&job(1), Tier::Low).await.unwrap_err();
        assert_eq!(
            err,
            JobError::Paused {
                tier: Tier::Low,
                remaining: Duration::from_secs(75),
            }
        );
        assert_eq!(err.retry_after(), Some(Duration::from_secs(75)));
        assert_eq!(f.stats.fetch_count().await, 0);
        assert_eq!(f.transport.attempt_count().await, 0);
        assert_eq!(f.counters.snapshot().paused, 1);

        // HIGH ignores pauses entirely and MEDIUM is not paused.
        assert!(f.worker.process(&job(2), Tier::High).await.is_ok());
        assert!(f.worker.process(&job(3), Tier::Medium).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_are_classified() {
        let cases = [
            (
                DispatchFailure::RateLimited {
                    retry_after: Some(Duration::from_secs(7)),
                },
                Err(JobError::RateLimited {
                    retry_after: Some(Duration::from_secs(7)),
                }),
            ),
            (DispatchFailure::Unmodified, Ok(JobOutcome::InvalidSession)),
            (DispatchFailure::TargetGone, Ok(JobOutcome::InvalidSession)),
            (
                DispatchFailure::Other("Bad Gateway".into()),
                Err(JobError::Transport("Bad Gateway".into())),
            ),
        ];

        for (failure, expected) in cases {
            let f = fixture();
            f.transport.fail_next(failure.clone()).await;
            let result = f.worker.process(&job(1), Tier::High).await;
            assert_eq!(result, expected, "for {failure:?}");
            assert!(f.dedup.is_empty(), "dedup must only change on success");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn every_outcome_increments_exactly_one_counter() {
        let f = fixture();
        f.transport
            .fail_next(DispatchFailure::RateLimited { retry_after: None })
            .await;
        f.transport.fail_next(DispatchFailure::TargetGone).await;
        f.transport.fail_next(DispatchFailure::Other("x".into())).await;
        for user in 1..=3 {
            let _ = f.worker.process(&job(user), Tier::High).await;
        }

        let c = f.counters.snapshot();
        assert_eq!(c.rate_limited, 1);
        assert_eq!(c.invalid_session, 1);
        assert_eq!(c.other_errors, 1);
        assert_eq!(c.success + c.skipped + c.paused, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_failures_are_classified() {
        let f = fixture();
        f.stats.forget_user(1).await;
        assert_eq!(
            f.worker.process(&job(1), Tier::High).await,
            Ok(JobOutcome::InvalidSession)
        );

        f.stats
            .fail_next(StatsError::Unavailable("connection refused".into()))
            .await;
        assert_eq!(
            f.worker.process(&job(2), Tier::High).await,
            Err(JobError::Fetch("connection refused".into()))
        );
        assert_eq!(f.transport.attempt_count().await, 0);

        let c = f.counters.snapshot();
        assert_eq!((c.invalid_session, c.other_errors), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn single_slot_prefers_high_over_low() {
        let f = fixture();
        let policy = TierPolicy {
            high_delay: Duration::ZERO,
            medium_delay: Duration::ZERO,
            low_delay: Duration::ZERO,
            ..TierPolicy::default()
        };
        let dispatch = Arc::new(DispatchQueue::new(policy));
        dispatch.enqueue(job(1), Tier::Low).await;
        dispatch.enqueue(job(2), Tier::High).await;
        let queue = Arc::new(RetryingQueue::new(
            dispatch.clone(),
            RetryPolicy {
                max_attempts: 3,
                backoff_base: Duration::from_secs(2),
            },
        ));

        let pool = WorkerPool::new(Arc::new(f.worker), queue, 1);
        assert_eq!(pool.idle_slots(), 1);
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        tracker.spawn(pool.run(tracker.clone(), cancel.clone()));

        while f.transport.sent_count().await < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cancel.cancel();
        tracker.close();
        tracker.wait().await;

        let order: Vec<i64> = f
            .transport
            .sent()
            .await
            .iter()
            .map(|r| r.chat_id - 1000)
            .collect();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(dispatch.counts().await.completed, 2);
    }
}
