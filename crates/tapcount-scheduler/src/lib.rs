// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adaptive priority update scheduler.
//!
//! Keeps many live counter messages fresh under a hard global edit rate.
//! Activity (clicks, registrations, periodic resync) is classified into a
//! [`Tier`](tapcount_core::Tier), queued with a tier-specific delay, and
//! drained by a worker pool bounded by both concurrency and aggregate rate.
//! When the backlog grows, lower tiers are paused so interactive updates
//! keep flowing.
//!
//! [`UpdateScheduler`] wires everything together and owns the background
//! tasks; the individual components are public for testing and embedding.

pub mod backpressure;
pub mod classifier;
pub mod click;
pub mod dedup;
pub mod metrics;
pub mod pause;
pub mod queue;
pub mod rate_limit;
pub mod render;
pub mod resync;
pub mod retry;
pub mod scheduler;
pub mod worker;

pub use backpressure::BackpressureController;
pub use classifier::TierPolicy;
pub use click::{ActivityEvent, ClickSubscriber};
pub use dedup::DedupCache;
pub use metrics::{LoadStatus, MetricsReport, MetricsReporter, Outcome, OutcomeCounters};
pub use pause::TierPauseState;
pub use queue::{DispatchQueue, QueueCounts, QueuedJob};
pub use rate_limit::RateLimiter;
pub use render::render_counter_message;
pub use resync::{ResyncLoop, ResyncSummary};
pub use retry::{RetryPolicy, RetryingQueue, Settlement};
pub use scheduler::{SchedulerStatus, UpdateScheduler};
pub use worker::{JobError, JobOutcome, UpdateWorker, WorkerPool};
