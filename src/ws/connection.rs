//! WebSocket connection loop.
//!
//! Each socket gets two halves: this task reads frames and feeds them to the
//! [`Dispatcher`] one at a time, while a writer task drains the connection's
//! outbound queue into the socket sink.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use crate::domain::ConnectionHandle;
use crate::service::Dispatcher;

/// Runs one WebSocket connection until either side closes it.
pub async fn run_connection(
    socket: WebSocket,
    dispatcher: Arc<Dispatcher>,
    remote_addr: SocketAddr,
    outbound_buffer: usize,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (handle, mut outbound) = ConnectionHandle::channel(outbound_buffer);

    let record = dispatcher.accept(handle, Some(remote_addr)).await;
    let id = record.id;

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if ws_tx.send(Message::text(frame)).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let _ = dispatcher.handle_text(id, text.as_str()).await;
                    }
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => {
                            let _ = dispatcher.handle_text(id, text).await;
                        }
                        Err(_) => {
                            tracing::warn!(conn_id = %id, len = bytes.len(), "discarding non-UTF-8 binary frame");
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::debug!(conn_id = %id, error = %err, "ws transport error");
                        break;
                    }
                }
            }
            _ = &mut writer => {
                tracing::debug!(conn_id = %id, "ws writer finished");
                break;
            }
        }
    }

    dispatcher.disconnect(id).await;
    writer.abort();
}
