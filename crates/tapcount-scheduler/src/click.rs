// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Activity events and the subscriber that turns them into HIGH jobs.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tapcount_core::{SessionKey, SessionStore, TapcountError, Tier, UpdateJob};

use crate::queue::DispatchQueue;

/// "A user clicked" notification from the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub user_id: i64,
    pub chat_id: i64,
    /// Target message, when the sender knows it. Looked up otherwise.
    #[serde(default)]
    pub message_id: Option<i32>,
    /// Epoch milliseconds. Defaults to receipt time.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl ActivityEvent {
    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.user_id, self.chat_id)
    }
}

/// Consumes activity events and enqueues each session at HIGH.
pub struct ClickSubscriber {
    events: mpsc::Receiver<ActivityEvent>,
    store: Arc<dyn SessionStore>,
    queue: Arc<DispatchQueue>,
}

impl ClickSubscriber {
    pub fn new(
        events: mpsc::Receiver<ActivityEvent>,
        store: Arc<dyn SessionStore>,
        queue: Arc<DispatchQueue>,
    ) -> Self {
        Self {
            events,
            store,
            queue,
        }
    }

    /// Handle one event. Returns `false` when the event was skipped because
    /// its target message is unknown.
    pub async fn handle(&self, event: ActivityEvent) -> Result<bool, TapcountError> {
        let key = event.key();
        let at_ms = event
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

        let known = self.store.touch_click(key, at_ms).await?;
        let message_id = match event.message_id {
            Some(id) => id,
            None if known => match self.store.get(key).await? {
                Some(record) => record.message_id,
                None => return Ok(false),
            },
            None => {
                debug!(session = %key, "activity for unknown session, skipping");
                return Ok(false);
            }
        };

        let job = UpdateJob {
            key,
            message_id,
            last_click_ms: Some(at_ms),
            last_heartbeat_ms: at_ms,
        };
        self.queue.enqueue(job, Tier::High).await;
        debug!(session = %key, "click enqueued at high priority");
        Ok(true)
    }

    /// Drain events until cancelled or every sender is dropped.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let event = tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                _ = cancel.cancelled() => break,
            };
            if let Err(e) = self.handle(event).await {
                warn!(session = %event.key(), error = %e, "failed to handle activity event");
            }
        }
        info!("click subscriber shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::TierPolicy;
    use tapcount_core::SessionRecord;
    use tapcount_test_utils::MemorySessionStore;

    fn subscriber() -> (
        mpsc::Sender<ActivityEvent>,
        ClickSubscriber,
        Arc<MemorySessionStore>,
        Arc<DispatchQueue>,
    ) {
        let (tx, rx) = mpsc::channel(8);
        let store = Arc::new(MemorySessionStore::new());
        let queue = Arc::new(DispatchQueue::new(TierPolicy::default()));
        let sub = ClickSubscriber::new(rx, store.clone(), queue.clone());
        (tx, sub, store, queue)
    }

    #[tokio::test(start_paused = true)]
    async fn click_on_stale_session_is_enqueued_high() {
        let (_tx, sub, store, queue) = subscriber();
        let key = SessionKey::new(1, 2);
        store
            .upsert(&SessionRecord {
                key,
                message_id: 33,
                last_click_ms: None,
                last_heartbeat_ms: 0,
            })
            .await
            .unwrap();

        let handled = sub
            .handle(ActivityEvent {
                user_id: 1,
                chat_id: 2,
                message_id: None,
                timestamp: Some(5_000),
            })
            .await
            .unwrap();
        assert!(handled);

        let job = queue.next().await;
        assert_eq!(job.tier, Tier::High);
        assert_eq!(job.job.message_id, 33);
        assert_eq!(job.job.last_click_ms, Some(5_000));
        assert_eq!(job.job.last_heartbeat_ms, 5_000);
        assert_eq!(store.get(key).await.unwrap().unwrap().last_click_ms, Some(5_000));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_session_without_message_is_skipped() {
        let (_tx, sub, _store, queue) = subscriber();
        let handled = sub
            .handle(ActivityEvent {
                user_id: 9,
                chat_id: 9,
                message_id: None,
                timestamp: None,
            })
            .await
            .unwrap();
        assert!(!handled);
        assert_eq!(queue.counts().await.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_message_id_needs_no_session() {
        let (_tx, sub, _store, queue) = subscriber();
        assert!(sub
            .handle(ActivityEvent {
                user_id: 9,
                chat_id: 9,
                message_id: Some(4),
                timestamp: Some(1),
            })
            .await
            .unwrap());
        assert_eq!(queue.counts().await.delayed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_when_senders_are_dropped() {
        let (tx, sub, _store, queue) = subscriber();
        let handle = tokio::spawn(sub.run(CancellationToken::new()));
        tx.send(ActivityEvent {
            user_id: 1,
            chat_id: 1,
            message_id: Some(1),
            timestamp: Some(1),
        })
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();
        assert_eq!(queue.counts().await.delayed, 1);
    }

    #[test]
    fn event_deserializes_from_camel_case() {
        let event: ActivityEvent =
            serde_json::from_str(r#"{"userId": 1, "chatId": -5, "timestamp": 10}"#).unwrap();
        assert_eq!(event.key(), SessionKey::new(1, -5));
        assert_eq!(event.message_id, None);
        assert_eq!(event.timestamp, Some(10));
    }
}
