//! Non-blocking persistence queue.
//!
//! [`PersistenceQueue`] stamps each chat message with its receipt time and
//! hands it to a single background writer task. Submitting never waits on
//! the store, so a slow or missing database cannot delay broadcast.
//! Stamping and enqueueing happen under one lock, which makes the writer's
//! insertion order identical to timestamp order.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, SubsecRound, Utc};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::StoreSlot;
use crate::domain::ChatMessage;

/// Hand-off point between the dispatcher and the store writer task.
#[derive(Debug)]
pub struct PersistenceQueue {
    inner: Option<Mutex<Stamper>>,
}

#[derive(Debug)]
struct Stamper {
    tx: mpsc::Sender<ChatMessage>,
    last: DateTime<Utc>,
}

impl PersistenceQueue {
    /// Spawns the writer task draining into whatever store `slot` holds.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(slot: StoreSlot, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(run_writer(rx, slot));
        Self {
            inner: Some(Mutex::new(Stamper {
                tx,
                last: DateTime::<Utc>::MIN_UTC,
            })),
        }
    }

    /// A queue that discards every message.
    #[must_use]
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Stamps and queues a message.
    ///
    /// Returns the stamped message when it was queued, or `None` when the
    /// queue is disabled, full, or its writer has stopped. Drops are logged.
    pub fn submit(&self, sender: &str, content: &str) -> Option<ChatMessage> {
        let inner = self.inner.as_ref()?;
        let mut stamper = inner.lock().unwrap_or_else(PoisonError::into_inner);

        let timestamp = Utc::now().trunc_subsecs(6).max(stamper.last);
        let message = ChatMessage::new(sender, content, timestamp);

        match stamper.tx.try_send(message.clone()) {
            Ok(()) => {
                stamper.last = timestamp;
                Some(message)
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(sender, "persistence queue full; message not stored");
                None
            }
            Err(TrySendError::Closed(_)) => {
                tracing::error!(sender, "persistence writer stopped; message not stored");
                None
            }
        }
    }
}

/// Writes queued messages to the store one at a time, in queue order.
async fn run_writer(mut rx: mpsc::Receiver<ChatMessage>, slot: StoreSlot) {
    while let Some(message) = rx.recv().await {
        let Some(store) = slot.get() else {
            tracing::warn!(
                sender = %message.sender,
                "message store not ready; message not stored"
            );
            continue;
        };
        if let Err(err) = store.insert(&message).await {
            tracing::warn!(
                sender = %message.sender,
                error = %err,
                "failed to store message"
            );
        }
    }
    tracing::debug!("persistence writer stopped");
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::RelayError;
    use crate::persistence::{InMemoryMessageStore, MessageStore};

    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl MessageStore for FailingStore {
        async fn insert(&self, _message: &ChatMessage) -> Result<(), RelayError> {
            Err(RelayError::Persistence("disk on fire".to_string()))
        }

        async fn find_all_sorted(&self) -> Result<Vec<ChatMessage>, RelayError> {
            Err(RelayError::Persistence("disk on fire".to_string()))
        }
    }

    async fn wait_for_len(store: &InMemoryMessageStore, len: usize) {
        for _ in 0..200 {
            if store.len().await >= len {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("store never reached {len} messages");
    }

    #[tokio::test]
    async fn queued_messages_reach_store_in_order() {
        let store = Arc::new(InMemoryMessageStore::new());
        let slot = StoreSlot::ready(Arc::clone(&store) as Arc<dyn MessageStore>);
        let queue = PersistenceQueue::spawn(slot, 16);

        for i in 0..10 {
            assert!(queue.submit("Alice", &format!("m{i}")).is_some());
        }
        wait_for_len(&store, 10).await;

        let Ok(all) = store.find_all_sorted().await else {
            panic!("read should succeed");
        };
        let contents: Vec<String> = all.iter().map(|m| m.content.clone()).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("m{i}")).collect();
        assert_eq!(contents, expected);
        assert!(all.windows(2).all(|w| matches!(w, [a, b] if a.timestamp <= b.timestamp)));
    }

    #[tokio::test]
    async fn timestamps_are_microsecond_precision() {
        let queue = PersistenceQueue::spawn(StoreSlot::new(), 4);
        let Some(message) = queue.submit("a", "b") else {
            panic!("should be queued");
        };
        assert_eq!(message.timestamp.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn disabled_queue_drops() {
        assert!(PersistenceQueue::disabled().submit("a", "b").is_none());
    }

    #[tokio::test]
    async fn store_not_ready_does_not_stop_writer() {
        let slot = StoreSlot::new();
        let queue = PersistenceQueue::spawn(slot.clone(), 4);
        assert!(queue.submit("a", "lost").is_some());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let store = Arc::new(InMemoryMessageStore::new());
        assert!(slot.install(Arc::clone(&store) as Arc<dyn MessageStore>));
        assert!(queue.submit("a", "kept").is_some());
        wait_for_len(&store, 1).await;

        let Ok(all) = store.find_all_sorted().await else {
            panic!("read should succeed");
        };
        assert_eq!(all.len(), 1);
        assert!(all.iter().all(|m| m.content == "kept"));
    }

    #[tokio::test]
    async fn failing_store_is_absorbed() {
        let queue = PersistenceQueue::spawn(StoreSlot::ready(Arc::new(FailingStore)), 4);
        assert!(queue.submit("a", "one").is_some());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(queue.submit("a", "two").is_some());
    }
}
