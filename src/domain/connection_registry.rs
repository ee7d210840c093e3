//! Live connection registry.
//!
//! [`ConnectionRegistry`] maps each open connection's [`ConnectionId`] to its
//! [`ConnectionRecord`] and outbound [`ConnectionHandle`]. Every operation
//! takes the map lock exactly once, so concurrent register / identify /
//! remove calls from different connection tasks never interleave inside a
//! single operation and a snapshot is never torn.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use super::ConnectionId;
use super::connection_record::{ConnectionHandle, ConnectionRecord};

/// One registry entry as returned by [`ConnectionRegistry::snapshot`].
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Identity and metadata at snapshot time.
    pub record: ConnectionRecord,
    /// Outbound transport handle.
    pub handle: ConnectionHandle,
}

/// Shared store of all live connections.
///
/// # Concurrency
///
/// - Lookups and snapshots share a read lock.
/// - Register, identify and remove take the write lock.
/// - Identity allocation is a lock-free atomic increment, so ids are unique
///   even when many connections register at once.
#[derive(Debug)]
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<ConnectionId, RegistryEntry>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    /// Creates an empty registry whose first identity is `1`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocates the next identity, inserts a placeholder record for the
    /// handle and returns that record.
    pub async fn register(
        &self,
        handle: ConnectionHandle,
        remote_addr: Option<SocketAddr>,
    ) -> ConnectionRecord {
        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = ConnectionRecord::new(id, remote_addr);
        let entry = RegistryEntry {
            record: record.clone(),
            handle,
        };
        self.entries.write().await.insert(id, entry);
        record
    }

    /// Overwrites the display name of `id`, keeping its identity.
    ///
    /// Returns `false` when the connection is no longer registered, which
    /// happens when an `init` races with the disconnect of the same socket.
    pub async fn identify(&self, id: ConnectionId, name: &str) -> bool {
        let mut map = self.entries.write().await;
        let Some(entry) = map.get_mut(&id) else {
            tracing::debug!(conn_id = %id, "identify on unregistered connection");
            return false;
        };
        name.clone_into(&mut entry.record.display_name);
        true
    }

    /// Returns a copy of the record for `id`.
    pub async fn lookup(&self, id: ConnectionId) -> Option<ConnectionRecord> {
        self.entries
            .read()
            .await
            .get(&id)
            .map(|entry| entry.record.clone())
    }

    /// Removes `id`, returning its last record. No-op when absent.
    pub async fn remove(&self, id: ConnectionId) -> Option<ConnectionRecord> {
        self.entries
            .write()
            .await
            .remove(&id)
            .map(|entry| entry.record)
    }

    /// Returns a consistent copy of every entry, ordered by identity.
    pub async fn snapshot(&self) -> Vec<RegistryEntry> {
        let mut entries: Vec<RegistryEntry> = self.entries.read().await.values().cloned().collect();
        entries.sort_by_key(|entry| entry.record.id);
        entries
    }

    /// Returns the number of live connections.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if no connection is registered.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
