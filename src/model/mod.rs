//! Domain entities recovered from the cache.
//!
//! All types serialize to plain JSON mappings; timestamps are RFC 3339 UTC.

mod conversation;
mod message;
mod report;

pub use conversation::{Conversation, ConversationType, Participant};
pub use message::{
    timestamp_from_millis, Message, CALL_EVENT_TYPE, RICH_TEXT_TYPE, SYSTEM_MESSAGE_PREFIX,
    UNKNOWN_SENDER,
};
pub use report::{
    BuildDiagnostics, CallRecord, ConversationHistory, SearchMatch, Summary, UserStats,
};
