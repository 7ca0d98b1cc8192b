// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`SessionStore`] trait.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use tapcount_config::model::StorageConfig;
use tapcount_core::{
    AdapterType, HealthStatus, PluginAdapter, SessionKey, SessionRecord, SessionStore,
    TapcountError,
};

use crate::database::{map_tr_err, Database};
use crate::queries::sessions::{self, Touch};

/// SQLite-backed session store with a sliding per-session TTL.
pub struct SqliteSessionStore {
    db: Database,
    ttl_ms: i64,
}

impl SqliteSessionStore {
    /// Opens the database named in `config` and applies migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, TapcountError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        Ok(Self::new(db, Duration::from_secs(config.session_ttl_secs)))
    }

    pub fn new(db: Database, ttl: Duration) -> Self {
        Self {
            db,
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Deletes rows whose TTL has lapsed. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<usize, TapcountError> {
        let purged = sessions::purge_expired(&self.db, now_ms()).await?;
        if purged > 0 {
            debug!(purged, "purged expired sessions");
        }
        Ok(purged)
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl PluginAdapter for SqliteSessionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SessionStore
    }

    async fn health_check(&self) -> Result<HealthStatus, TapcountError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TapcountError> {
        self.db.checkpoint().await?;
        debug!("session store shutdown: WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn upsert(&self, record: &SessionRecord) -> Result<(), TapcountError> {
        sessions::upsert(&self.db, record, now_ms(), self.ttl_ms).await
    }

    async fn get(&self, key: SessionKey) -> Result<Option<SessionRecord>, TapcountError> {
        sessions::get(&self.db, key, now_ms()).await
    }

    async fn touch_heartbeat(&self, key: SessionKey, at_ms: i64) -> Result<bool, TapcountError> {
        sessions::touch(&self.db, key, Touch::Heartbeat, at_ms, now_ms(), self.ttl_ms).await
    }

    async fn touch_click(&self, key: SessionKey, at_ms: i64) -> Result<bool, TapcountError> {
        sessions::touch(&self.db, key, Touch::Click, at_ms, now_ms(), self.ttl_ms).await
    }

    async fn list(&self) -> Result<Vec<SessionRecord>, TapcountError> {
        sessions::list(&self.db, now_ms()).await
    }

    async fn remove(&self, key: SessionKey) -> Result<bool, TapcountError> {
        sessions::remove(&self.db, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(path: &std::path::Path) -> StorageConfig {
        StorageConfig {
            database_path: path.display().to_string(),
            wal_mode: true,
            session_ttl_secs: 600,
        }
    }

    #[tokio::test]
    async fn open_creates_file_and_reports_healthy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("sessions.db");
        let store = SqliteSessionStore::open(&config(&path)).await.unwrap();

        assert!(path.exists());
        assert_eq!(store.adapter_type(), AdapterType::SessionStore);
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn sessions_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let record = SessionRecord {
            key: SessionKey::new(42, -100),
            message_id: 7,
            last_click_ms: None,
            last_heartbeat_ms: now_ms(),
        };

        {
            let store = SqliteSessionStore::open(&config(&path)).await.unwrap();
            store.upsert(&record).await.unwrap();
            store.shutdown().await.unwrap();
        }

        let store = SqliteSessionStore::open(&config(&path)).await.unwrap();
        assert_eq!(store.get(record.key).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn touches_on_unknown_session_return_false() {
        let store = SqliteSessionStore::new(
            Database::open_in_memory().await.unwrap(),
            Duration::from_secs(600),
        );
        let key = SessionKey::new(1, 1);
        assert!(!store.touch_heartbeat(key, now_ms()).await.unwrap());
        assert!(!store.touch_click(key, now_ms()).await.unwrap());
        assert!(!store.remove(key).await.unwrap());
    }

    #[tokio::test]
    async fn zero_ttl_sessions_are_purged() {
        let store = SqliteSessionStore::new(
            Database::open_in_memory().await.unwrap(),
            Duration::ZERO,
        );
        let record = SessionRecord {
            key: SessionKey::new(5, 5),
            message_id: 1,
            last_click_ms: None,
            last_heartbeat_ms: now_ms(),
        };
        store.upsert(&record).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.purge_expired().await.unwrap(), 1);
    }
}
