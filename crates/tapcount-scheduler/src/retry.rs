// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry decorator over the dispatch queue.
//!
//! Failure classification lives in the worker; this module only decides,
//! per settled job, whether to complete it, put it back with backoff, or
//! drop it as failed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, trace, warn};

use tapcount_config::model::WorkerConfig;

use crate::queue::{DispatchQueue, QueuedJob};
use crate::worker::{JobError, JobOutcome};

/// Attempt ceiling and exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total executions allowed, counting the first.
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        }
    }

    /// Wait before the next execution after `attempt` failed:
    /// `base * 2^(attempt - 1)`, raised to any server-requested wait.
    pub fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let backoff = self.backoff_base.saturating_mul(1 << exp);
        match retry_after {
            Some(server) => backoff.max(server),
            None => backoff,
        }
    }
}

/// What happened to a settled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Completed(JobOutcome),
    /// Put back; `attempt` is the execution number it will run as.
    Retrying { attempt: u32, delay: Duration },
    /// Out of attempts.
    Dropped { attempts: u32 },
}

/// A [`DispatchQueue`] that applies a [`RetryPolicy`] to failed jobs.
pub struct RetryingQueue {
    inner: Arc<DispatchQueue>,
    policy: RetryPolicy,
}

impl RetryingQueue {
    pub fn new(inner: Arc<DispatchQueue>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &Arc<DispatchQueue> {
        &self.inner
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn next(&self) -> QueuedJob {
        self.inner.next().await
    }

    /// Record the result of running `job`.
    pub async fn settle(&self, job: QueuedJob, result: Result<JobOutcome, JobError>) -> Settlement {
        match result {
            Ok(outcome) => {
                self.inner.complete(&job).await;
                trace!(session = %job.job.key, ?outcome, "job completed");
                Settlement::Completed(outcome)
            }
            Err(err) if job.attempt < self.policy.max_attempts => {
                let delay = self.policy.backoff(job.attempt, err.retry_after());
                let attempt = job.attempt + 1;
                warn!(
                    session = %job.job.key,
                    tier = %job.tier,
                    attempt = job.attempt,
                    retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "job failed, retrying"
                );
                let mut retry = job;
                retry.attempt = attempt;
                self.inner.requeue(retry, delay).await;
                Settlement::Retrying { attempt, delay }
            }
            Err(err) => {
                error!(
                    session = %job.job.key,
                    tier = %job.tier,
                    attempts = job.attempt,
                    error = %err,
                    "job failed permanently, dropping"
                );
                self.inner.fail(&job).await;
                Settlement::Dropped {
                    attempts: job.attempt,
                }
            }
        }
    }
}
