//! Domain layer: connection identity, the live connection registry and the
//! chat message entity.

pub mod chat_message;
pub mod connection_id;
pub mod connection_record;
pub mod connection_registry;

pub use chat_message::ChatMessage;
pub use connection_id::ConnectionId;
pub use connection_record::{ConnectionHandle, ConnectionRecord, Delivery};
pub use connection_registry::{ConnectionRegistry, RegistryEntry};
