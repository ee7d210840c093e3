//! WebSocket layer: upgrade handling, the per-connection loop and the wire
//! protocol.
//!
//! The chat channel is served at `/ws` on the HTTP port, and additionally
//! at `/` on the dedicated WebSocket port when one is configured.

pub mod connection;
pub mod handler;
pub mod messages;
