//! Persistence layer: the append-only message log.
//!
//! [`MessageStore`] is the narrow interface the relay needs from durable
//! storage: insert one message, and read everything back sorted by
//! timestamp. [`StoreSlot`] holds the process-wide store once it has
//! connected; until then persistence is skipped and `GET /messages`
//! answers 500.

pub mod memory;
pub mod postgres;
pub mod writer;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::domain::ChatMessage;
use crate::error::RelayError;

pub use memory::InMemoryMessageStore;
pub use postgres::PostgresMessageStore;
pub use writer::PersistenceQueue;

/// Append-only, timestamp-ordered log of chat messages.
#[async_trait]
pub trait MessageStore: Send + Sync + std::fmt::Debug {
    /// Appends one message.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] when the backend rejects the write.
    async fn insert(&self, message: &ChatMessage) -> Result<(), RelayError>;

    /// Returns every stored message in ascending timestamp order. Messages
    /// with equal timestamps keep their insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] when the backend read fails.
    async fn find_all_sorted(&self) -> Result<Vec<ChatMessage>, RelayError>;
}

/// Process-wide slot for the message store.
///
/// Filled at most once, possibly long after startup when the store was
/// unreachable at first. Cloning shares the same slot.
#[derive(Debug, Clone, Default)]
pub struct StoreSlot {
    inner: Arc<OnceCell<Arc<dyn MessageStore>>>,
}

impl StoreSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot that is already filled.
    #[must_use]
    pub fn ready(store: Arc<dyn MessageStore>) -> Self {
        Self {
            inner: Arc::new(OnceCell::new_with(Some(store))),
        }
    }

    /// Installs the store. Returns `false` if a store was already installed.
    pub fn install(&self, store: Arc<dyn MessageStore>) -> bool {
        self.inner.set(store).is_ok()
    }

    /// Returns the store if it is ready.
    #[must_use]
    pub fn get(&self) -> Option<Arc<dyn MessageStore>> {
        self.inner.get().map(Arc::clone)
    }

    /// Returns the store or [`RelayError::StoreNotReady`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::StoreNotReady`] while the slot is empty.
    pub fn require(&self) -> Result<Arc<dyn MessageStore>, RelayError> {
        self.get().ok_or(RelayError::StoreNotReady)
    }

    /// Returns `true` once a store has been installed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.initialized()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot_is_not_ready() {
        let slot = StoreSlot::new();
        assert!(!slot.is_ready());
        assert!(matches!(slot.require(), Err(RelayError::StoreNotReady)));
    }

    #[test]
    fn install_is_shared_and_once() {
        let slot = StoreSlot::new();
        let view = slot.clone();

        assert!(slot.install(Arc::new(InMemoryMessageStore::new())));
        assert!(!slot.install(Arc::new(InMemoryMessageStore::new())));
        assert!(view.is_ready());
        assert!(view.get().is_some());
    }

    #[test]
    fn ready_constructor_is_filled() {
        let slot = StoreSlot::ready(Arc::new(InMemoryMessageStore::new()));
        assert!(slot.require().is_ok());
    }
}
