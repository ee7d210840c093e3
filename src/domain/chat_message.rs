//! Persisted chat message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One chat message as written to the message store and returned by
/// `GET /messages`.
///
/// `sender` is the display name captured when the message arrived, so a
/// later rename does not alter messages already sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    /// Display name of the sending connection at send time.
    pub sender: String,
    /// Opaque message body.
    pub content: String,
    /// Server receipt time.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a message stamped with the given receipt time.
    #[must_use]
    pub fn new(
        sender: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            timestamp,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_three_fields() {
        let Some(ts) = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single() else {
            panic!("valid timestamp");
        };
        let msg = ChatMessage::new("Alice", "hi", ts);
        let Ok(value) = serde_json::to_value(&msg) else {
            panic!("serializable");
        };
        assert_eq!(
            value,
            serde_json::json!({
                "sender": "Alice",
                "content": "hi",
                "timestamp": "2024-05-01T12:00:00Z",
            })
        );
    }
}
