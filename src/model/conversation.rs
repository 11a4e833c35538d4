//! Conversations and their participants.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

// =============================================================================
// ConversationType
// =============================================================================

/// Kind of conversation as reported by the client.
///
/// The set is open; unrecognised kinds are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConversationType {
    Chat,
    Meeting,
    Space,
    Topic,
    /// Call logs and other system threads.
    Thread,
    Conversation,
    Other(String),
}

impl ConversationType {
    pub fn parse(s: &str) -> Self {
        match s {
            "Chat" => Self::Chat,
            "Meeting" => Self::Meeting,
            "Space" => Self::Space,
            "Topic" => Self::Topic,
            "Thread" => Self::Thread,
            "Conversation" => Self::Conversation,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Chat => "Chat",
            Self::Meeting => "Meeting",
            Self::Space => "Space",
            Self::Topic => "Topic",
            Self::Thread => "Thread",
            Self::Conversation => "Conversation",
            Self::Other(s) => s,
        }
    }

    /// The `threadProperties` field holding this kind's title.
    pub fn title_property(&self) -> Option<&'static str> {
        match self {
            Self::Meeting => Some("topic"),
            Self::Space => Some("spaceThreadTopic"),
            Self::Topic => Some("topicThreadTopic"),
            _ => None,
        }
    }
}

impl fmt::Display for ConversationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ConversationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// =============================================================================
// Participant
// =============================================================================

/// A user id with its resolved display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// A chat, meeting, channel thread or call log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub conversation_type: Option<ConversationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub members: Vec<Participant>,
    pub message_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Whether the conversation's kind equals `filter` (exact, as the client spells it).
    pub fn has_type(&self, filter: &str) -> bool {
        self.conversation_type
            .as_ref()
            .is_some_and(|kind| kind.as_str() == filter)
    }

    /// Title for display, falling back to a shortened id.
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) if !title.is_empty() => title.clone(),
            _ => format!("Conversation {}", self.id.chars().take(8).collect::<String>()),
        }
    }
}
