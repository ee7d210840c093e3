//! chat-relay server entry point.
//!
//! Starts the Axum HTTP server with the REST and WebSocket endpoints, and
//! optionally a dedicated WebSocket listener.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use chat_relay::app_state::AppState;
use chat_relay::config::{LogFormat, RelayConfig};
use chat_relay::domain::ConnectionRegistry;
use chat_relay::persistence::postgres::{connect_store, connect_until_ready};
use chat_relay::persistence::{PersistenceQueue, StoreSlot};
use chat_relay::server;
use chat_relay::service::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration; a missing DATABASE_URL stops here
    let config = RelayConfig::from_env().context("invalid configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting chat-relay");

    // Connect the store in the background; chat runs degraded until it is up
    let store = StoreSlot::new();
    let store_config = config.store.clone();
    tokio::spawn(connect_until_ready(
        store_config.retry_interval,
        store.clone(),
        move || connect_store(store_config.clone()),
    ));

    // Build the dispatcher
    let persistence = PersistenceQueue::spawn(store.clone(), config.persist_queue_capacity);
    let dispatcher = Dispatcher::new(Arc::new(ConnectionRegistry::new()), persistence)
        .with_sender_in_broadcast(config.broadcast_include_sender);

    let app_state = AppState {
        dispatcher: Arc::new(dispatcher),
        store,
        outbound_buffer: config.outbound_buffer,
    };

    // Optional dedicated WebSocket listener
    if let Some(ws_addr) = config.ws_listen_addr {
        let ws_listener = tokio::net::TcpListener::bind(ws_addr)
            .await
            .with_context(|| format!("binding websocket listener on {ws_addr}"))?;
        tracing::info!(addr = %ws_addr, "websocket listener ready");
        let ws_app = server::build_ws_app(app_state.clone());
        tokio::spawn(async move {
            if let Err(err) = server::serve(ws_listener, ws_app).await {
                tracing::error!(error = %err, "websocket listener stopped");
            }
        });
    }

    // Start server
    let app = server::build_app(app_state, &config);
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding http listener on {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    server::serve(listener, app).await?;

    Ok(())
}
