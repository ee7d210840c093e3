//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::persistence::StoreSlot;
use crate::service::Dispatcher;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Broadcast dispatcher owning the connection registry.
    pub dispatcher: Arc<Dispatcher>,
    /// Message store, once connected.
    pub store: StoreSlot,
    /// Per-connection outbound frame bound.
    pub outbound_buffer: usize,
}
