// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end scheduler testing.
//!
//! `TestHarness` assembles an [`UpdateScheduler`] over mock collaborators.
//! Pair it with `#[tokio::test(start_paused = true)]` so tier delays,
//! backoff and pause cooldowns elapse instantly.

use std::sync::Arc;
use std::time::Duration;

use tapcount_config::model::TapcountConfig;
use tapcount_core::{SessionKey, TapcountError, Tier};
use tapcount_scheduler::{ActivityEvent, UpdateScheduler};

use crate::memory_store::MemorySessionStore;
use crate::mock_stats::MockStats;
use crate::mock_transport::MockTransport;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: TapcountConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = TapcountConfig::default();
        // Periodic tasks stay out of the way unless a test asks for them.
        config.resync.interval_secs = 24 * 60 * 60;
        config.backpressure.check_interval_secs = 24 * 60 * 60;
        config.metrics.report_interval_secs = 24 * 60 * 60;
        Self { config }
    }

    /// Set the base of the exponential retry backoff.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.config.worker.backoff_base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.worker.concurrency = concurrency;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.config.worker.max_attempts = attempts;
        self
    }

    pub fn build(self) -> TestHarness {
        let store = Arc::new(MemorySessionStore::new());
        let stats = Arc::new(MockStats::new());
        let transport = Arc::new(MockTransport::new());
        let scheduler = Arc::new(UpdateScheduler::new(
            &self.config,
            store.clone(),
            stats.clone(),
            transport.clone(),
        ));
        TestHarness {
            scheduler,
            store,
            stats,
            transport,
            config: self.config,
        }
    }
}

/// A scheduler wired to mock collaborators.
pub struct TestHarness {
    pub scheduler: Arc<UpdateScheduler>,
    pub store: Arc<MemorySessionStore>,
    pub stats: Arc<MockStats>,
    pub transport: Arc<MockTransport>,
    pub config: TapcountConfig,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Start the scheduler's background tasks and let each run once, so
    /// startup work such as the first resync pass happens before the test
    /// continues.
    pub async fn start(&self) -> Result<(), TapcountError> {
        self.scheduler.start()?;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    pub async fn register(
        &self,
        user_id: i64,
        chat_id: i64,
        message_id: i32,
    ) -> Result<Tier, TapcountError> {
        self.scheduler
            .register_session(SessionKey::new(user_id, chat_id), message_id)
            .await
    }

    /// Publish a click stamped with wall-clock now.
    pub async fn click(&self, user_id: i64, chat_id: i64) -> Result<(), TapcountError> {
        self.scheduler
            .record_activity(ActivityEvent {
                user_id,
                chat_id,
                message_id: None,
                timestamp: None,
            })
            .await
    }

    /// Let `by` elapse. Under a paused clock every task runs to idle before
    /// time jumps to the next timer, so this is deterministic.
    pub async fn advance(&self, by: Duration) {
        tokio::time::sleep(by).await;
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }
}
