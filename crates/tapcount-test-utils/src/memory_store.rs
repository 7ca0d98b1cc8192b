// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory session store.
//!
//! Holds records in a map with no TTL; tests that need expiry use the SQLite
//! store directly.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use tapcount_core::{
    AdapterType, HealthStatus, PluginAdapter, SessionKey, SessionRecord, SessionStore,
    TapcountError,
};

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionKey, SessionRecord>>,
    failing_removes: Mutex<HashSet<SessionKey>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Make every `remove` of `key` fail with a storage error.
    pub async fn fail_remove(&self, key: SessionKey) {
        self.failing_removes.lock().await.insert(key);
    }
}

#[async_trait]
impl PluginAdapter for MemorySessionStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SessionStore
    }

    async fn health_check(&self) -> Result<HealthStatus, TapcountError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TapcountError> {
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn upsert(&self, record: &SessionRecord) -> Result<(), TapcountError> {
        self.sessions
            .lock()
            .await
            .insert(record.key, record.clone());
        Ok(())
    }

    async fn get(&self, key: SessionKey) -> Result<Option<SessionRecord>, TapcountError> {
        Ok(self.sessions.lock().await.get(&key).cloned())
    }

    async fn touch_heartbeat(&self, key: SessionKey, at_ms: i64) -> Result<bool, TapcountError> {
        let mut sessions = self.sessions.lock().await;
        Ok(match sessions.get_mut(&key) {
            Some(record) => {
                record.last_heartbeat_ms = at_ms;
                true
            }
            None => false,
        })
    }

    async fn touch_click(&self, key: SessionKey, at_ms: i64) -> Result<bool, TapcountError> {
        let mut sessions = self.sessions.lock().await;
        Ok(match sessions.get_mut(&key) {
            Some(record) => {
                record.last_click_ms = Some(at_ms);
                true
            }
            None => false,
        })
    }

    async fn list(&self) -> Result<Vec<SessionRecord>, TapcountError> {
        let mut records: Vec<_> = self.sessions.lock().await.values().cloned().collect();
        records.sort_by_key(|r| r.key);
        Ok(records)
    }

    async fn remove(&self, key: SessionKey) -> Result<bool, TapcountError> {
        if self.failing_removes.lock().await.contains(&key) {
            return Err(TapcountError::Internal(format!("remove {key} failed")));
        }
        Ok(self.sessions.lock().await.remove(&key).is_some())
    }
}
