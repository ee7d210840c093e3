//! WebSocket wire protocol: inbound client events, the server handshake and
//! broadcast envelopes.
//!
//! Every frame is a JSON object with a `type` field:
//!
//! | Direction | Frame |
//! |-----------|-------|
//! | C → S | `{"type": "init", "name": "Alice"}` |
//! | C → S | `{"type": "message", "content": "hi"}` |
//! | S → C | `{"type": "init", "name": "Server", "isServer": true}` (once, on connect) |
//! | S → C | the sender's `message` frame, forwarded to every other client |

use serde::Serialize;
use serde_json::{Map, Value};

/// Name the server announces in its handshake.
pub const SERVER_NAME: &str = "Server";

/// A decoded client → server event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The client announces its display name.
    ///
    /// `name` is `None` when the field is missing, not a string, or blank.
    Init {
        /// Requested display name.
        name: Option<String>,
    },
    /// The client sends a chat message.
    Message {
        /// Message body.
        content: String,
    },
}

/// A parsed inbound frame: the decoded event plus the original JSON object,
/// kept so that broadcasts can forward the sender's envelope unchanged.
#[derive(Debug, Clone)]
pub struct InboundFrame {
    /// Decoded event.
    pub event: ClientEvent,
    /// The frame exactly as received.
    pub raw: Map<String, Value>,
}

/// Why an inbound frame was discarded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The frame is not valid JSON.
    #[error("malformed JSON: {0}")]
    Malformed(String),

    /// The frame is JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// The object has no string `type` field.
    #[error("missing event type")]
    MissingType,

    /// The `type` field names an event the relay does not know.
    #[error("unknown event type {0:?}")]
    UnknownType(String),

    /// A known event is missing a required field.
    #[error("invalid {event} event: {reason}")]
    InvalidPayload {
        /// Event type.
        event: &'static str,
        /// What was wrong.
        reason: &'static str,
    },
}

/// Decodes one text frame from a client.
///
/// # Errors
///
/// Returns a [`ProtocolError`] describing why the frame must be discarded.
pub fn parse_client_event(text: &str) -> Result<InboundFrame, ProtocolError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    let Value::Object(raw) = value else {
        return Err(ProtocolError::NotAnObject);
    };

    let kind = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    let event = match kind {
        "init" => ClientEvent::Init {
            name: raw
                .get("name")
                .and_then(Value::as_str)
                .filter(|name| !name.trim().is_empty())
                .map(str::to_owned),
        },
        "message" => {
            let content = raw.get("content").and_then(Value::as_str).ok_or(
                ProtocolError::InvalidPayload {
                    event: "message",
                    reason: "content must be a string",
                },
            )?;
            ClientEvent::Message {
                content: content.to_owned(),
            }
        }
        other => return Err(ProtocolError::UnknownType(other.to_owned())),
    };

    Ok(InboundFrame { event, raw })
}

/// Server → client events originated by the relay itself.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Handshake sent once, immediately after a connection is accepted.
    Init {
        /// Always [`SERVER_NAME`].
        name: &'static str,
        /// Distinguishes the handshake from a peer's `init`.
        #[serde(rename = "isServer")]
        is_server: bool,
    },
}

impl ServerEvent {
    /// The connection handshake.
    #[must_use]
    pub const fn handshake() -> Self {
        Self::Init {
            name: SERVER_NAME,
            is_server: true,
        }
    }

    /// Serializes the event to a JSON text frame.
    #[must_use]
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Builds the frame forwarded to peers for a `message` event.
///
/// Without a sender the original text is forwarded byte for byte. With a
/// sender, the original object is re-encoded with a `sender` field set to
/// the given display name.
#[must_use]
pub fn broadcast_frame(original: &str, raw: &Map<String, Value>, sender: Option<&str>) -> String {
    let Some(sender) = sender else {
        return original.to_owned();
    };
    let mut envelope = raw.clone();
    envelope.insert("sender".to_owned(), Value::String(sender.to_owned()));
    serde_json::to_string(&envelope).unwrap_or_else(|_| original.to_owned())
}
