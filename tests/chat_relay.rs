//! End-to-end tests: a real listener on an ephemeral port, driven by
//! WebSocket clients and HTTP requests.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use chat_relay::app_state::AppState;
use chat_relay::config::RelayConfig;
use chat_relay::domain::{ChatMessage, ConnectionRegistry};
use chat_relay::persistence::{InMemoryMessageStore, MessageStore, PersistenceQueue, StoreSlot};
use chat_relay::server;
use chat_relay::service::Dispatcher;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const QUIET: Duration = Duration::from_millis(150);

fn relay_state(store: StoreSlot) -> (AppState, RelayConfig) {
    let Ok(config) = RelayConfig::from_lookup(|key| match key {
        "STORE_BACKEND" => Some("memory".to_string()),
        _ => None,
    }) else {
        panic!("test config should load");
    };

    let dispatcher = Dispatcher::new(
        Arc::new(ConnectionRegistry::new()),
        PersistenceQueue::spawn(store.clone(), config.persist_queue_capacity),
    );
    let state = AppState {
        dispatcher: Arc::new(dispatcher),
        store,
        outbound_buffer: config.outbound_buffer,
    };
    (state, config)
}

async fn listen(app: Router) -> SocketAddr {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind ephemeral port");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    tokio::spawn(server::serve(listener, app));
    addr
}

async fn start(store: StoreSlot) -> SocketAddr {
    let (state, config) = relay_state(store);
    listen(server::build_app(state, &config)).await
}

fn memory_store() -> (StoreSlot, Arc<InMemoryMessageStore>) {
    let store = Arc::new(InMemoryMessageStore::new());
    (
        StoreSlot::ready(Arc::clone(&store) as Arc<dyn MessageStore>),
        store,
    )
}

/// Connects to `/ws` and consumes the server handshake.
async fn connect(addr: SocketAddr) -> Ws {
    connect_url(&format!("ws://{addr}/ws")).await
}

async fn connect_url(url: &str) -> Ws {
    let Ok((mut ws, _)) = connect_async(url).await else {
        panic!("websocket connect failed");
    };
    let Some(hello) = recv(&mut ws).await else {
        panic!("handshake expected");
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&hello) else {
        panic!("handshake must be JSON");
    };
    assert_eq!(
        value,
        serde_json::json!({"type": "init", "name": "Server", "isServer": true})
    );
    ws
}

async fn send(ws: &mut Ws, text: &str) {
    if ws.send(Message::text(text)).await.is_err() {
        panic!("send failed");
    }
}

/// Next text frame, or `None` if nothing arrives within [`QUIET`].
async fn recv(ws: &mut Ws) -> Option<String> {
    loop {
        match tokio::time::timeout(QUIET, ws.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(text.to_string()),
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
            _ => return None,
        }
    }
}

async fn history(addr: SocketAddr, expected: usize) -> Vec<ChatMessage> {
    let url = format!("http://{addr}/messages");
    for _ in 0..100 {
        if let Ok(response) = reqwest::get(&url).await
            && let Ok(messages) = response.json::<Vec<ChatMessage>>().await
            && messages.len() >= expected
        {
            return messages;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("history never reached {expected} messages");
}

#[tokio::test]
async fn alice_says_hi_to_two_peers() {
    let (slot, _store) = memory_store();
    let addr = start(slot).await;

    let mut c1 = connect(addr).await;
    let mut c2 = connect(addr).await;
    let mut c3 = connect(addr).await;

    send(&mut c1, r#"{"type":"init","name":"Alice"}"#).await;
    send(&mut c1, r#"{"type":"message","content":"hi"}"#).await;

    for peer in [&mut c2, &mut c3] {
        let Some(frame) = recv(peer).await else {
            panic!("peer should receive the broadcast");
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&frame) else {
            panic!("broadcast must be JSON");
        };
        assert_eq!(value, serde_json::json!({"type": "message", "content": "hi"}));
        assert!(recv(peer).await.is_none(), "exactly one broadcast expected");
    }
    assert!(recv(&mut c1).await.is_none(), "sender must not get an echo");

    let messages = history(addr, 1).await;
    assert_eq!(messages.len(), 1);
    let Some(message) = messages.first() else {
        panic!("one message expected");
    };
    assert_eq!(message.sender, "Alice");
    assert_eq!(message.content, "hi");
}

#[tokio::test]
async fn malformed_frame_keeps_connection_usable() {
    let (slot, _store) = memory_store();
    let addr = start(slot).await;

    let mut c1 = connect(addr).await;
    let mut c2 = connect(addr).await;

    send(&mut c1, "{this is not json").await;
    send(&mut c1, r#"{"type":"wave"}"#).await;
    assert!(recv(&mut c2).await.is_none());

    send(&mut c1, r#"{"type":"message","content":"still here"}"#).await;
    let Some(frame) = recv(&mut c2).await else {
        panic!("broadcast expected after malformed frame");
    };
    assert!(frame.contains("still here"));

    // And the malformed sender can still receive.
    send(&mut c2, r#"{"type":"message","content":"back at you"}"#).await;
    let Some(frame) = recv(&mut c1).await else {
        panic!("c1 should still receive");
    };
    assert!(frame.contains("back at you"));
}

#[tokio::test]
async fn disconnected_peer_does_not_break_broadcast() {
    let (slot, _store) = memory_store();
    let addr = start(slot).await;

    let mut c1 = connect(addr).await;
    let mut c2 = connect(addr).await;
    let mut c3 = connect(addr).await;

    let _ = c2.close(None).await;
    drop(c2);
    tokio::time::sleep(Duration::from_millis(50)).await;

    send(&mut c1, r#"{"type":"message","content":"anyone?"}"#).await;
    let Some(frame) = recv(&mut c3).await else {
        panic!("c3 should receive");
    };
    assert!(frame.contains("anyone?"));

    let messages = history(addr, 1).await;
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn chat_works_while_store_is_down() {
    let addr = start(StoreSlot::new()).await;

    let mut c1 = connect(addr).await;
    let mut c2 = connect(addr).await;

    send(&mut c1, r#"{"type":"message","content":"no db"}"#).await;
    let Some(frame) = recv(&mut c2).await else {
        panic!("broadcast must not depend on the store");
    };
    assert!(frame.contains("no db"));

    let Ok(response) = reqwest::get(format!("http://{addr}/messages")).await else {
        panic!("http request failed");
    };
    assert_eq!(response.status().as_u16(), 500);
    let Ok(body) = response.text().await else {
        panic!("body readable");
    };
    assert_eq!(body, "message store not ready");
}

#[tokio::test]
async fn history_is_sorted_and_tracks_renames() {
    let (slot, _store) = memory_store();
    let addr = start(slot).await;

    let mut c1 = connect(addr).await;
    send(&mut c1, r#"{"type":"message","content":"one"}"#).await;
    send(&mut c1, r#"{"type":"init","name":"Carol"}"#).await;
    send(&mut c1, r#"{"type":"message","content":"two"}"#).await;

    let messages = history(addr, 2).await;
    let pairs: Vec<(&str, &str)> = messages
        .iter()
        .map(|m| (m.sender.as_str(), m.content.as_str()))
        .collect();
    assert_eq!(pairs, vec![("User 1", "one"), ("Carol", "two")]);
    assert!(
        messages
            .windows(2)
            .all(|w| matches!(w, [a, b] if a.timestamp <= b.timestamp))
    );
}

#[tokio::test]
async fn dedicated_ws_listener_serves_root_and_ws() {
    let (slot, _store) = memory_store();
    let (state, _config) = relay_state(slot);
    let addr = listen(server::build_ws_app(state)).await;

    let mut at_root = connect_url(&format!("ws://{addr}/")).await;
    let mut at_ws = connect_url(&format!("ws://{addr}/ws")).await;

    send(&mut at_root, r#"{"type":"message","content":"from root"}"#).await;
    let Some(frame) = recv(&mut at_ws).await else {
        panic!("/ws peer should receive the broadcast");
    };
    assert!(frame.contains("from root"));

    send(&mut at_ws, r#"{"type":"message","content":"from ws"}"#).await;
    let Some(frame) = recv(&mut at_root).await else {
        panic!("/ peer should receive the broadcast");
    };
    assert!(frame.contains("from ws"));

    // REST routes live on the main listener only.
    let Ok(response) = reqwest::get(format!("http://{addr}/messages")).await else {
        panic!("http request failed");
    };
    assert_eq!(response.status().as_u16(), 404);
}
