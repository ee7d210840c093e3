//! Process-local message store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::MessageStore;
use crate::domain::ChatMessage;
use crate::error::RelayError;

/// Message store backed by a `Vec` behind a [`RwLock`].
///
/// History lives only as long as the process. Selected with
/// `STORE_BACKEND=memory`, and used throughout the test suite.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<ChatMessage>>,
}

impl InMemoryMessageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored messages.
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Returns `true` if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert(&self, message: &ChatMessage) -> Result<(), RelayError> {
        self.messages.write().await.push(message.clone());
        Ok(())
    }

    async fn find_all_sorted(&self) -> Result<Vec<ChatMessage>, RelayError> {
        let mut messages = self.messages.read().await.clone();
        // Stable: equal timestamps keep insertion order.
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[tokio::test]
    async fn returns_ascending_by_timestamp() {
        let store = InMemoryMessageStore::new();
        let now = Utc::now();
        let later = ChatMessage::new("b", "second", now + Duration::seconds(1));
        let earlier = ChatMessage::new("a", "first", now);

        assert!(store.insert(&later).await.is_ok());
        assert!(store.insert(&earlier).await.is_ok());

        let Ok(all) = store.find_all_sorted().await else {
            panic!("read should succeed");
        };
        let contents: Vec<&str> = all.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn equal_timestamps_keep_insertion_order() {
        let store = InMemoryMessageStore::new();
        let now = Utc::now();
        for content in ["x", "y", "z"] {
            assert!(store.insert(&ChatMessage::new("s", content, now)).await.is_ok());
        }

        let Ok(all) = store.find_all_sorted().await else {
            panic!("read should succeed");
        };
        let contents: Vec<&str> = all.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["x", "y", "z"]);
        assert_eq!(store.len().await, 3);
    }
}
