//! Chat messages.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Message types with this prefix are system activity (joins, renames, ...).
pub const SYSTEM_MESSAGE_PREFIX: &str = "ThreadActivity/";
/// Message type whose content is HTML.
pub const RICH_TEXT_TYPE: &str = "RichText/Html";
/// Message type of call events.
pub const CALL_EVENT_TYPE: &str = "Event/Call";

/// Sender name used when nothing better is known.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// One message of a conversation.
///
/// `content` is stored as received; rich-text bodies are rendered when read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub conversation_id: String,
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub sender_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: String,
}

impl Message {
    pub fn is_system(&self) -> bool {
        self.message_type.starts_with(SYSTEM_MESSAGE_PREFIX)
    }

    pub fn is_rich_text(&self) -> bool {
        self.message_type == RICH_TEXT_TYPE
    }

    pub fn is_call_event(&self) -> bool {
        self.message_type == CALL_EVENT_TYPE
    }
}

/// Milliseconds since the epoch as a UTC time; out-of-range values map to the epoch.
pub fn timestamp_from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kinds() {
        let mut message = Message {
            conversation_id: "c".to_string(),
            timestamp: timestamp_from_millis(0),
            sender: "Alice".to_string(),
            sender_id: "8:a".to_string(),
            content: String::new(),
            message_type: "ThreadActivity/AddMember".to_string(),
        };
        assert!(message.is_system());

        message.message_type = RICH_TEXT_TYPE.to_string();
        assert!(message.is_rich_text());
        assert!(!message.is_system());
    }

    #[test]
    fn test_timestamps_serialize_as_rfc3339() {
        let ts = timestamp_from_millis(1_700_000_000_123);
        assert_eq!(
            serde_json::to_value(ts).unwrap(),
            serde_json::json!("2023-11-14T22:13:20.123Z")
        );
        assert_eq!(timestamp_from_millis(i64::MAX), DateTime::UNIX_EPOCH);
    }
}
