// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection lifecycle: open, PRAGMA setup, migrations, checkpoint.
//!
//! All statements run on tokio-rusqlite's background thread. Do not open a
//! second connection for writes.

use tapcount_core::TapcountError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Handle to the session database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` and migrates it.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, TapcountError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| TapcountError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| TapcountError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path, wal_mode, "session database opened");
        Ok(db)
    }

    /// Opens a private in-memory database. Used by tests.
    pub async fn open_in_memory() -> Result<Self, TapcountError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| TapcountError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), TapcountError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
                }
                conn.execute_batch("PRAGMA busy_timeout=5000;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        self.conn
            .call(|conn| run_migrations(conn))
            .await
            .map_err(|e| TapcountError::Storage {
                source: Box::new(e),
            })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Truncates the WAL so the main file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), TapcountError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Convert a tokio-rusqlite error into `TapcountError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TapcountError {
    TapcountError::Storage {
        source: Box::new(e),
    }
}
