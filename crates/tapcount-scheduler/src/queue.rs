// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process dispatch queue ordered by tier and eligibility time.
//!
//! A job enters the delayed set with `ready_at = now + delay`. Once due it is
//! promoted to its tier's FIFO. [`DispatchQueue::next`] always hands out the
//! head of the highest non-empty tier. Jobs for the same session may
//! coexist; the queue never coalesces them.
//!
//! The queue tracks in-flight jobs but knows nothing about retries; the
//! [`RetryingQueue`](crate::retry::RetryingQueue) decorator settles every
//! job handed out by `next`.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::time::Duration;

use serde::Serialize;
use tapcount_core::{Tier, UpdateJob};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::trace;

use crate::classifier::TierPolicy;

/// A job as held by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    /// Unique per submission, including retries.
    pub id: u64,
    pub job: UpdateJob,
    pub tier: Tier,
    /// 1 for the first execution, incremented on every retry.
    pub attempt: u32,
    pub enqueued_at: Instant,
}

/// Job counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    /// Waiting out their tier delay or retry backoff.
    pub delayed: usize,
    /// Eligible, not yet picked up.
    pub waiting: usize,
    /// Handed to a worker, not yet settled.
    pub active: usize,
    pub completed: u64,
    /// Dropped after exhausting retries.
    pub failed: u64,
}

impl QueueCounts {
    /// Backlog the backpressure controller reacts to.
    pub fn pending(&self) -> usize {
        self.waiting + self.delayed
    }
}

struct Delayed {
    ready_at: Instant,
    seq: u64,
    job: QueuedJob,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.ready_at, self.seq).cmp(&(other.ready_at, other.seq))
    }
}

#[derive(Default)]
struct Inner {
    seq: u64,
    delayed: BinaryHeap<Reverse<Delayed>>,
    /// Indexed by [`tier_slot`].
    ready: [VecDeque<QueuedJob>; 3],
    active: usize,
    completed: u64,
    failed: u64,
}

fn tier_slot(tier: Tier) -> usize {
    match tier {
        Tier::High => 0,
        Tier::Medium => 1,
        Tier::Low => 2,
    }
}

impl Inner {
    fn push(&mut self, job: QueuedJob, ready_at: Instant) {
        self.seq += 1;
        self.delayed.push(Reverse(Delayed {
            ready_at,
            seq: self.seq,
            job,
        }));
    }

    /// Move every due job into its tier FIFO, oldest eligibility first.
    fn promote(&mut self, now: Instant) {
        while let Some(Reverse(head)) = self.delayed.peek() {
            if head.ready_at > now {
                break;
            }
            if let Some(Reverse(due)) = self.delayed.pop() {
                self.ready[tier_slot(due.job.tier)].push_back(due.job);
            }
        }
    }

    fn pop_ready(&mut self) -> Option<QueuedJob> {
        Tier::BY_PRIORITY
            .iter()
            .find_map(|tier| self.ready[tier_slot(*tier)].pop_front())
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.delayed.peek().map(|Reverse(d)| d.ready_at)
    }
}

/// Priority-and-delay ordered work queue.
///
/// Designed for a single consumer calling [`next`](Self::next); any number
/// of producers may enqueue concurrently.
pub struct DispatchQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    policy: TierPolicy,
}

impl DispatchQueue {
    pub fn new(policy: TierPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    /// Admit a job; it becomes eligible after the tier's delay.
    pub async fn enqueue(&self, job: UpdateJob, tier: Tier) -> u64 {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        let id = inner.seq + 1;
        let queued = QueuedJob {
            id,
            job,
            tier,
            attempt: 1,
            enqueued_at: now,
        };
        inner.push(queued, now + self.policy.delay(tier));
        drop(inner);
        self.notify.notify_one();
        id
    }

    /// Put a handed-out job back, eligible after `delay`. Used for retries.
    pub async fn requeue(&self, mut job: QueuedJob, delay: Duration) {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        inner.active = inner.active.saturating_sub(1);
        job.id = inner.seq + 1;
        job.enqueued_at = now;
        inner.push(job, now + delay);
        drop(inner);
        self.notify.notify_one();
    }

    /// Wait for the next eligible job, highest tier first.
    ///
    /// Cancel-safe: a job is only removed from the queue when this future
    /// resolves.
    pub async fn next(&self) -> QueuedJob {
        loop {
            let deadline = {
                let mut inner = self.inner.lock().await;
                inner.promote(Instant::now());
                if let Some(job) = inner.pop_ready() {
                    inner.active += 1;
                    return job;
                }
                inner.next_deadline()
            };

            match deadline {
                Some(at) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(at) => {}
                        _ = self.notify.notified() => {}
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    /// Mark a handed-out job as finished.
    pub async fn complete(&self, job: &QueuedJob) {
        let mut inner = self.inner.lock().await;
        inner.active = inner.active.saturating_sub(1);
        inner.completed += 1;
        trace!(job = job.id, tier = %job.tier, attempt = job.attempt, "released completed job");
    }

    /// Mark a handed-out job as permanently failed.
    pub async fn fail(&self, job: &QueuedJob) {
        let mut inner = self.inner.lock().await;
        inner.active = inner.active.saturating_sub(1);
        inner.failed += 1;
        trace!(job = job.id, tier = %job.tier, attempt = job.attempt, "released failed job");
    }

    pub async fn counts(&self) -> QueueCounts {
        let mut inner = self.inner.lock().await;
        inner.promote(Instant::now());
        QueueCounts {
            delayed: inner.delayed.len(),
            waiting: inner.ready.iter().map(VecDeque::len).sum(),
            active: inner.active,
            completed: inner.completed,
            failed: inner.failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapcount_core::SessionKey;
    use tracing_test::traced_test;

    fn job(user: i64) -> UpdateJob {
        UpdateJob {
            key: SessionKey::new(user, user * 10),
            message_id: 1,
            last_click_ms: None,
            last_heartbeat_ms: 0,
        }
    }

    async fn try_next(queue: &DispatchQueue) -> Option<QueuedJob> {
        tokio::time::timeout(Duration::from_millis(1), queue.next())
            .await
            .ok()
    }

    #[tokio::test(start_paused = true)]
    async fn job_is_not_eligible_before_its_delay() {
        let queue = DispatchQueue::new(TierPolicy::default());
        queue.enqueue(job(1), Tier::Medium).await;

        tokio::time::advance(Duration::from_millis(9_990)).await;
        assert!(try_next(&queue).await.is_none());
        assert_eq!(queue.counts().await.delayed, 1);

        tokio::time::advance(Duration::from_millis(10)).await;
        let got = try_next(&queue).await.expect("eligible after delay");
        assert_eq!(got.job.key.user_id, 1);
        assert_eq!(got.attempt, 1);
        assert_eq!(queue.counts().await.active, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn high_is_preferred_over_eligible_low() {
        let queue = DispatchQueue::new(TierPolicy::default());
        queue.enqueue(job(1), Tier::Low).await;
        tokio::time::advance(Duration::from_secs(60)).await;
        queue.enqueue(job(2), Tier::High).await;
        tokio::time::advance(Duration::from_secs(2)).await;

        let counts = queue.counts().await;
        assert_eq!(counts.waiting, 2);

        assert_eq!(queue.next().await.tier, Tier::High);
        assert_eq!(queue.next().await.tier, Tier::Low);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn settling_releases_the_slot_and_logs_the_job() {
        let queue = DispatchQueue::new(TierPolicy::default());
        queue.enqueue(job(1), Tier::High).await;
        queue.enqueue(job(2), Tier::High).await;

        let first = queue.next().await;
        let second = queue.next().await;
        assert_eq!(queue.counts().await.active, 2);

        queue.complete(&first).await;
        queue.fail(&second).await;

        let counts = queue.counts().await;
        assert_eq!((counts.active, counts.completed, counts.failed), (0, 1, 1));
        assert!(logs_contain(&format!("job={}", first.id)));
        assert!(logs_contain("released completed job"));
        assert!(logs_contain(&format!("job={}", second.id)));
        assert!(logs_contain("released failed job"));
    }

    #[tokio::test(start_paused = true)]
    async fn same_tier_is_fifo() {
        let queue = DispatchQueue::new(TierPolicy::default());
        for user in 1..=3 {
            queue.enqueue(job(user), Tier::Medium).await;
            tokio::time::advance(Duration::from_millis(5)).await;
        }
        tokio::time::advance(Duration::from_secs(10)).await;

        let order: Vec<i64> = [
            queue.next().await,
            queue.next().await,
            queue.next().await,
        ]
        .iter()
        .map(|q| q.job.key.user_id)
        .collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_session_jobs_coexist() {
        let queue = DispatchQueue::new(TierPolicy::default());
        queue.enqueue(job(1), Tier::High).await;
        queue.enqueue(job(1), Tier::High).await;
        assert_eq!(queue.counts().await.pending(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn next_wakes_when_a_job_arrives() {
        let queue = std::sync::Arc::new(DispatchQueue::new(TierPolicy::default()));
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next().await })
        };
        tokio::task::yield_now().await;
        queue.enqueue(job(9), Tier::High).await;

        let got = consumer.await.unwrap();
        assert_eq!(got.job.key.user_id, 9);
        // Woken by the notify, then slept until the HIGH delay elapsed.
        assert!(got.enqueued_at.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn requeue_and_settle_update_counts() {
        let queue = DispatchQueue::new(TierPolicy::default());
        queue.enqueue(job(1), Tier::High).await;
        let mut first = queue.next().await;
        first.attempt += 1;
        queue.requeue(first, Duration::from_secs(4)).await;

        let counts = queue.counts().await;
        assert_eq!((counts.active, counts.delayed), (0, 1));

        let second = queue.next().await;
        assert_eq!(second.attempt, 2);
        queue.fail(&second).await;

        let counts = queue.counts().await;
        assert_eq!((counts.active, counts.failed, counts.completed), (0, 1, 0));
    }
}
