//! # chat-relay
//!
//! Real-time WebSocket chat relay with a persistent message log.
//!
//! Clients connect to `/ws`, optionally announce a display name, and send
//! text messages. Each message is forwarded to every other connected client
//! and appended to the message store; `GET /messages` returns the stored
//! history. Persistence never blocks or fails delivery: when the store is
//! down, chat continues and history has gaps.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── WS Handler + connection loop (ws/)
//!     ├── REST Handlers (api/)
//!     │
//!     ├── Dispatcher (service/)
//!     │     ├── ConnectionRegistry (domain/)
//!     │     └── PersistenceQueue ──► writer task
//!     │
//!     └── MessageStore (persistence/): PostgreSQL or in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod server;
pub mod service;
pub mod ws;
