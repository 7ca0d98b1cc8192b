// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock render-data source.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use tapcount_core::types::{GlobalStats, LeaderboardEntry, UserStats};
use tapcount_core::{
    AdapterType, HealthStatus, PluginAdapter, RenderStats, StatsError, StatsSource, TapcountError,
};

/// Answers every user with stable stats unless told otherwise.
///
/// By default user `n` is `user{n}` with zero clicks. Override with
/// [`set_clicks`](Self::set_clicks), make users unknown with
/// [`forget_user`](Self::forget_user), or queue failures with
/// [`fail_next`](Self::fail_next).
#[derive(Default)]
pub struct MockStats {
    clicks: Mutex<HashMap<i64, u64>>,
    unknown: Mutex<HashSet<i64>>,
    failures: Mutex<VecDeque<StatsError>>,
    total_clicks: Mutex<u64>,
    fetches: Mutex<usize>,
}

impl MockStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_clicks(&self, user_id: i64, clicks: u64) {
        self.clicks.lock().await.insert(user_id, clicks);
    }

    pub async fn set_total_clicks(&self, total: u64) {
        *self.total_clicks.lock().await = total;
    }

    /// Make `fetch` return [`StatsError::NotFound`] for this user.
    pub async fn forget_user(&self, user_id: i64) {
        self.unknown.lock().await.insert(user_id);
    }

    pub async fn fail_next(&self, error: StatsError) {
        self.failures.lock().await.push_back(error);
    }

    pub async fn fetch_count(&self) -> usize {
        *self.fetches.lock().await
    }
}

#[async_trait]
impl PluginAdapter for MockStats {
    fn name(&self) -> &str {
        "mock-stats"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Stats
    }

    async fn health_check(&self) -> Result<HealthStatus, TapcountError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TapcountError> {
        Ok(())
    }
}

#[async_trait]
impl StatsSource for MockStats {
    async fn fetch(&self, user_id: i64) -> Result<RenderStats, StatsError> {
        *self.fetches.lock().await += 1;
        if let Some(error) = self.failures.lock().await.pop_front() {
            return Err(error);
        }
        if self.unknown.lock().await.contains(&user_id) {
            return Err(StatsError::NotFound);
        }

        let clicks = self.clicks.lock().await.get(&user_id).copied().unwrap_or(0);
        let username = format!("user{user_id}");
        Ok(RenderStats {
            user_stats: UserStats {
                username: username.clone(),
                clicks,
            },
            global_stats: GlobalStats {
                total_clicks: *self.total_clicks.lock().await,
                total_users: 1,
            },
            leaderboard: vec![LeaderboardEntry { username, clicks }],
        })
    }
}
