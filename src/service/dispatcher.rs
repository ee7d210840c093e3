//! Broadcast dispatcher: the per-connection state machine.
//!
//! A connection moves through `Connecting -> Identified-or-Anonymous ->
//! Closed`. [`Dispatcher::accept`] registers it and sends the handshake,
//! [`Dispatcher::handle_text`] processes each inbound frame, and
//! [`Dispatcher::disconnect`] removes it. Nothing that happens on one
//! connection is ever reported to, or fails, another connection.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::domain::{
    ConnectionHandle, ConnectionId, ConnectionRecord, ConnectionRegistry, Delivery,
};
use crate::persistence::PersistenceQueue;
use crate::ws::messages::{
    ClientEvent, InboundFrame, ProtocolError, ServerEvent, broadcast_frame, parse_client_event,
};

/// Per-peer delivery counts for one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers whose outbound queue accepted the frame.
    pub delivered: usize,
    /// Peers whose transport had already closed.
    pub skipped_closed: usize,
    /// Peers whose outbound queue was full; the frame was dropped for them.
    pub dropped_full: usize,
}

/// What the dispatcher did with one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The connection's display name changed.
    Identified {
        /// New display name.
        name: String,
    },
    /// A chat message was relayed to peers.
    Relayed {
        /// Display name attributed to the message.
        sender: String,
        /// Whether the message was handed to the persistence queue. The
        /// writer may still drop it if the store is down or rejects it.
        queued: bool,
        /// Fan-out result.
        report: BroadcastReport,
    },
    /// The frame had no effect.
    Ignored(IgnoreReason),
}

/// Why a frame had no effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The frame could not be decoded.
    Protocol(ProtocolError),
    /// An `init` without a usable name.
    EmptyName,
    /// The connection is no longer registered.
    UnknownConnection,
}

/// Accepts connections, handles their events and fans out messages.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    persistence: PersistenceQueue,
    include_sender: bool,
}

impl Dispatcher {
    /// Creates a dispatcher over the given registry and persistence queue.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, persistence: PersistenceQueue) -> Self {
        Self {
            registry,
            persistence,
            include_sender: false,
        }
    }

    /// Makes broadcasts carry the sender's display name in a `sender` field
    /// instead of forwarding the client frame verbatim.
    #[must_use]
    pub fn with_sender_in_broadcast(mut self, include_sender: bool) -> Self {
        self.include_sender = include_sender;
        self
    }

    /// Returns the connection registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Registers a new connection and sends it the server handshake.
    pub async fn accept(
        &self,
        handle: ConnectionHandle,
        remote_addr: Option<SocketAddr>,
    ) -> ConnectionRecord {
        let greeting = handle.try_deliver(ServerEvent::handshake().to_frame());
        let record = self.registry.register(handle, remote_addr).await;

        tracing::info!(
            conn_id = %record.id,
            remote_addr = ?record.remote_addr,
            "client connected"
        );
        if greeting != Delivery::Queued {
            tracing::debug!(conn_id = %record.id, ?greeting, "handshake not delivered");
        }
        record
    }

    /// Decodes and dispatches one text frame from connection `id`.
    pub async fn handle_text(&self, id: ConnectionId, text: &str) -> EventOutcome {
        let frame = match parse_client_event(text) {
            Ok(frame) => frame,
            Err(err @ ProtocolError::UnknownType(_)) => {
                tracing::warn!(conn_id = %id, error = %err, "ignoring unknown event");
                return EventOutcome::Ignored(IgnoreReason::Protocol(err));
            }
            Err(err) => {
                tracing::warn!(conn_id = %id, error = %err, "discarding malformed event");
                return EventOutcome::Ignored(IgnoreReason::Protocol(err));
            }
        };

        match frame.event {
            ClientEvent::Init { name: Some(ref name) } => self.identify(id, name).await,
            ClientEvent::Init { name: None } => {
                tracing::warn!(conn_id = %id, "init without a usable name; ignoring");
                EventOutcome::Ignored(IgnoreReason::EmptyName)
            }
            ClientEvent::Message { ref content } => self.relay(id, text, &frame, content).await,
        }
    }

    /// Removes connection `id` from the registry.
    pub async fn disconnect(&self, id: ConnectionId) {
        match self.registry.remove(id).await {
            Some(record) => tracing::info!(
                conn_id = %id,
                name = %record.display_name,
                "client disconnected"
            ),
            None => tracing::debug!(conn_id = %id, "disconnect of unregistered connection"),
        }
    }

    async fn identify(&self, id: ConnectionId, name: &str) -> EventOutcome {
        if !self.registry.identify(id, name).await {
            return EventOutcome::Ignored(IgnoreReason::UnknownConnection);
        }
        tracing::info!(conn_id = %id, name, "client identified");
        EventOutcome::Identified {
            name: name.to_owned(),
        }
    }

    async fn relay(
        &self,
        id: ConnectionId,
        original: &str,
        frame: &InboundFrame,
        content: &str,
    ) -> EventOutcome {
        let sender = match self.registry.lookup(id).await {
            Some(record) => record.display_name,
            None => id.placeholder_name(),
        };
        tracing::info!(conn_id = %id, sender = %sender, len = content.len(), "message received");

        let queued = self.persistence.submit(&sender, content).is_some();

        let include = self.include_sender.then_some(sender.as_str());
        let payload = broadcast_frame(original, &frame.raw, include);
        let report = self.broadcast(id, &payload).await;

        tracing::debug!(
            conn_id = %id,
            delivered = report.delivered,
            skipped_closed = report.skipped_closed,
            dropped_full = report.dropped_full,
            "broadcast complete"
        );
        EventOutcome::Relayed {
            sender,
            queued,
            report,
        }
    }

    /// Delivers `payload` to every open connection except `from`.
    ///
    /// Works on a registry snapshot; connections that close after the
    /// snapshot are counted as skipped.
    pub async fn broadcast(&self, from: ConnectionId, payload: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for entry in self.registry.snapshot().await {
            if entry.record.id == from {
                continue;
            }
            if !entry.handle.is_open() {
                report.skipped_closed += 1;
                continue;
            }
            match entry.handle.try_deliver(payload.to_owned()) {
                Delivery::Queued => report.delivered += 1,
                Delivery::Closed => report.skipped_closed += 1,
                Delivery::Full => {
                    tracing::warn!(conn_id = %entry.record.id, "outbound queue full; dropping frame");
                    report.dropped_full += 1;
                }
            }
        }
        report
    }
}
