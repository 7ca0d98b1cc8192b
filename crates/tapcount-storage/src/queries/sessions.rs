// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session row operations.
//!
//! Every write sets `expires_at_ms = now_ms + ttl_ms`. Reads ignore rows
//! whose expiry has passed; `purge_expired` deletes them.

use rusqlite::{params, OptionalExtension, Row};
use tapcount_core::{SessionKey, SessionRecord, TapcountError};

use crate::database::{map_tr_err, Database};

const COLUMNS: &str = "user_id, chat_id, message_id, last_click_ms, last_heartbeat_ms";

fn from_row(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        key: SessionKey::new(row.get(0)?, row.get(1)?),
        message_id: row.get(2)?,
        last_click_ms: row.get(3)?,
        last_heartbeat_ms: row.get(4)?,
    })
}

/// Insert or replace a session.
pub async fn upsert(
    db: &Database,
    record: &SessionRecord,
    now_ms: i64,
    ttl_ms: i64,
) -> Result<(), TapcountError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions (user_id, chat_id, message_id, last_click_ms, last_heartbeat_ms, expires_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (user_id, chat_id) DO UPDATE SET
                     message_id = excluded.message_id,
                     last_click_ms = excluded.last_click_ms,
                     last_heartbeat_ms = excluded.last_heartbeat_ms,
                     expires_at_ms = excluded.expires_at_ms",
                params![
                    record.key.user_id,
                    record.key.chat_id,
                    record.message_id,
                    record.last_click_ms,
                    record.last_heartbeat_ms,
                    now_ms + ttl_ms,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a live session.
pub async fn get(
    db: &Database,
    key: SessionKey,
    now_ms: i64,
) -> Result<Option<SessionRecord>, TapcountError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM sessions
                     WHERE user_id = ?1 AND chat_id = ?2 AND expires_at_ms > ?3"
                ),
                params![key.user_id, key.chat_id, now_ms],
                from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Which timestamp column a touch updates.
#[derive(Debug, Clone, Copy)]
pub enum Touch {
    Heartbeat,
    Click,
}

/// Stamp a live session and push its expiry out. Returns `false` when no
/// live row matched.
pub async fn touch(
    db: &Database,
    key: SessionKey,
    touch: Touch,
    at_ms: i64,
    now_ms: i64,
    ttl_ms: i64,
) -> Result<bool, TapcountError> {
    let column = match touch {
        Touch::Heartbeat => "last_heartbeat_ms",
        Touch::Click => "last_click_ms",
    };
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                &format!(
                    "UPDATE sessions SET {column} = ?1, expires_at_ms = ?2
                     WHERE user_id = ?3 AND chat_id = ?4 AND expires_at_ms > ?5"
                ),
                params![at_ms, now_ms + ttl_ms, key.user_id, key.chat_id, now_ms],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// List every live session ordered by key.
pub async fn list(db: &Database, now_ms: i64) -> Result<Vec<SessionRecord>, TapcountError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM sessions
                 WHERE expires_at_ms > ?1 ORDER BY user_id, chat_id"
            ))?;
            let rows = stmt.query_map(params![now_ms], from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a session. Returns `false` when nothing was deleted.
pub async fn remove(db: &Database, key: SessionKey) -> Result<bool, TapcountError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM sessions WHERE user_id = ?1 AND chat_id = ?2",
                params![key.user_id, key.chat_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete every expired row. Returns how many were removed.
pub async fn purge_expired(db: &Database, now_ms: i64) -> Result<usize, TapcountError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM sessions WHERE expires_at_ms <= ?1",
                params![now_ms],
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: i64 = 600_000;

    fn record(user: i64, chat: i64, heartbeat: i64) -> SessionRecord {
        SessionRecord {
            key: SessionKey::new(user, chat),
            message_id: 77,
            last_click_ms: None,
            last_heartbeat_ms: heartbeat,
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let db = Database::open_in_memory().await.unwrap();
        let rec = record(1, 10, 1_000);
        upsert(&db, &rec, 1_000, TTL).await.unwrap();

        let fetched = get(&db, rec.key, 2_000).await.unwrap();
        assert_eq!(fetched, Some(rec));
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let db = Database::open_in_memory().await.unwrap();
        upsert(&db, &record(1, 10, 1_000), 1_000, TTL).await.unwrap();
        let mut newer = record(1, 10, 5_000);
        newer.message_id = 99;
        upsert(&db, &newer, 5_000, TTL).await.unwrap();

        let all = list(&db, 5_000).await.unwrap();
        assert_eq!(all, vec![newer]);
    }

    #[tokio::test]
    async fn expired_rows_are_invisible_and_purgeable() {
        let db = Database::open_in_memory().await.unwrap();
        upsert(&db, &record(1, 10, 0), 0, TTL).await.unwrap();
        upsert(&db, &record(2, 20, 0), 400_000, TTL).await.unwrap();

        let now = TTL + 1;
        assert_eq!(get(&db, SessionKey::new(1, 10), now).await.unwrap(), None);
        assert_eq!(list(&db, now).await.unwrap().len(), 1);
        assert!(!touch(&db, SessionKey::new(1, 10), Touch::Click, now, now, TTL)
            .await
            .unwrap());

        assert_eq!(purge_expired(&db, now).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn touch_refreshes_expiry() {
        let db = Database::open_in_memory().await.unwrap();
        let key = SessionKey::new(3, 30);
        upsert(&db, &record(3, 30, 0), 0, TTL).await.unwrap();

        assert!(touch(&db, key, Touch::Heartbeat, 500_000, 500_000, TTL)
            .await
            .unwrap());
        assert!(touch(&db, key, Touch::Click, 550_000, 550_000, TTL)
            .await
            .unwrap());

        // Past the original expiry but inside the refreshed one.
        let fetched = get(&db, key, 700_000).await.unwrap().unwrap();
        assert_eq!(fetched.last_heartbeat_ms, 500_000);
        assert_eq!(fetched.last_click_ms, Some(550_000));
    }

    #[tokio::test]
    async fn remove_reports_whether_row_existed() {
        let db = Database::open_in_memory().await.unwrap();
        let key = SessionKey::new(4, 40);
        upsert(&db, &record(4, 40, 0), 0, TTL).await.unwrap();
        assert!(remove(&db, key).await.unwrap());
        assert!(!remove(&db, key).await.unwrap());
    }
}
