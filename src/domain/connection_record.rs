//! Connection record and outbound transport handle.

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::ConnectionId;

/// Server-side identity and metadata for one live client session.
///
/// Owned by [`super::ConnectionRegistry`]; everything else works on clones
/// returned from registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    /// Identity allocated at connect time (immutable).
    pub id: ConnectionId,

    /// Name attached to messages sent from this connection.
    ///
    /// Starts as `User <id>` and is overwritten by every valid `init` event.
    pub display_name: String,

    /// Peer address as seen by the listener, when known.
    pub remote_addr: Option<SocketAddr>,

    /// Time the connection was accepted.
    pub connected_at: DateTime<Utc>,
}

impl ConnectionRecord {
    /// Creates a record carrying the placeholder display name.
    #[must_use]
    pub fn new(id: ConnectionId, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            id,
            display_name: id.placeholder_name(),
            remote_addr,
            connected_at: Utc::now(),
        }
    }
}

/// Result of handing one frame to a connection's outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The frame was queued for the connection's writer task.
    Queued,
    /// The outbound queue is at capacity; the frame was dropped.
    Full,
    /// The writer task is gone; the transport is closed.
    Closed,
}

/// Opaque handle to a connection's transport.
///
/// Wraps the bounded queue feeding the connection's writer task. Sends never
/// wait: a full queue drops the frame so that one stalled peer cannot hold up
/// delivery to the others.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    tx: mpsc::Sender<String>,
}

impl ConnectionHandle {
    /// Creates a handle together with the receiving end the writer task drains.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Returns `true` while the writer task is still draining the queue.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queues a text frame without waiting.
    pub fn try_deliver(&self, frame: String) -> Delivery {
        match self.tx.try_send(frame) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}
