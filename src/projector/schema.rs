//! Narrow per-store decoders from the generic value tree to typed records.
//!
//! Field-presence checks happen here and nowhere else. Required fields that are
//! absent or mistyped reject the record; optional fields that are absent or
//! mistyped are treated as absent.

use chrono::{DateTime, Utc};

use crate::model::{timestamp_from_millis, ConversationType};
use crate::value::{DecodedGraph, DecodedValue};

use super::error::{ProjectionError, Result};

/// A `conversations` store row.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationRecord {
    pub id: String,
    pub conversation_type: Option<ConversationType>,
    pub title: Option<String>,
    pub members: Vec<MemberRecord>,
    pub last_message: Option<LastMessageRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LastMessageRecord {
    pub from: Option<String>,
    pub display_name: Option<String>,
    pub arrival: Option<DateTime<Utc>>,
}

/// One entry of a reply chain's message map.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub conversation_id: String,
    pub timestamp: DateTime<Utc>,
    pub from: String,
    pub display_name: Option<String>,
    pub content: String,
    pub message_type: String,
}

/// Messages of one reply chain plus the number of entries that were rejected.
#[derive(Debug, Default)]
pub struct ReplyChainRecord {
    pub messages: Vec<MessageRecord>,
    pub rejected: Vec<ProjectionError>,
}

// =============================================================================
// Field access
// =============================================================================

fn as_object<'a>(graph: &'a DecodedGraph, value: &'a DecodedValue) -> Result<&'a DecodedValue> {
    let value = graph.resolve(value);
    match value {
        DecodedValue::Object(_) => Ok(value),
        other => Err(ProjectionError::NotAnObject(other.type_name())),
    }
}

fn required_str(
    graph: &DecodedGraph,
    object: &DecodedValue,
    field: &'static str,
) -> Result<String> {
    match graph.field(object, field) {
        None => Err(ProjectionError::MissingField(field)),
        Some(value) if value.is_nullish() => Err(ProjectionError::MissingField(field)),
        Some(DecodedValue::Str(s)) => Ok(s.clone()),
        Some(other) => Err(ProjectionError::WrongType {
            field,
            expected: "string",
            found: other.type_name(),
        }),
    }
}

fn optional_str(graph: &DecodedGraph, object: &DecodedValue, field: &str) -> Option<String> {
    graph
        .field(object, field)
        .and_then(DecodedValue::as_str)
        .map(str::to_string)
}

/// A millisecond timestamp stored as a number, a numeric string or RFC 3339.
fn optional_time(
    graph: &DecodedGraph,
    object: &DecodedValue,
    field: &str,
) -> Option<DateTime<Utc>> {
    match graph.field(object, field)? {
        DecodedValue::Str(s) => match s.trim().parse::<i64>() {
            Ok(millis) => Some(timestamp_from_millis(millis)),
            Err(_) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|t| t.with_timezone(&Utc)),
        },
        other => other.as_i64().map(timestamp_from_millis),
    }
}

// =============================================================================
// conversations
// =============================================================================

impl ConversationRecord {
    pub fn from_graph(graph: &DecodedGraph) -> Result<Self> {
        let root = as_object(graph, graph.root())?;
        let id = required_str(graph, root, "id")?;

        let conversation_type =
            optional_str(graph, root, "type").map(|t| ConversationType::parse(&t));

        let title = conversation_type
            .as_ref()
            .and_then(ConversationType::title_property)
            .and_then(|property| graph.path(root, &["threadProperties", property]))
            .and_then(DecodedValue::as_str)
            .map(str::to_string);

        let members = graph
            .field(root, "members")
            .and_then(DecodedValue::as_array)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|member| member_record(graph, member))
                    .collect()
            })
            .unwrap_or_default();

        let last_message = graph
            .field(root, "lastMessage")
            .filter(|value| matches!(value, DecodedValue::Object(_)))
            .map(|last| LastMessageRecord {
                from: optional_str(graph, last, "from"),
                display_name: optional_str(graph, last, "imdisplayname"),
                arrival: optional_time(graph, last, "originalArrivalTime"),
            });

        Ok(Self {
            id,
            conversation_type,
            title,
            members,
            last_message,
        })
    }
}

fn member_record(graph: &DecodedGraph, member: &DecodedValue) -> Option<MemberRecord> {
    let member = as_object(graph, member).ok()?;
    let id = required_str(graph, member, "id").ok()?;
    let display_name = graph
        .path(member, &["nameHint", "displayName"])
        .and_then(DecodedValue::as_str)
        .map(str::to_string);
    Some(MemberRecord { id, display_name })
}

// =============================================================================
// replychains
// =============================================================================

impl ReplyChainRecord {
    pub fn from_graph(graph: &DecodedGraph) -> Result<Self> {
        let root = as_object(graph, graph.root())?;
        let message_map = match graph.field(root, "messageMap") {
            None => return Err(ProjectionError::MissingField("messageMap")),
            Some(value @ DecodedValue::Object(_)) => value,
            Some(other) => {
                return Err(ProjectionError::WrongType {
                    field: "messageMap",
                    expected: "object",
                    found: other.type_name(),
                })
            }
        };

        let mut record = ReplyChainRecord::default();
        for (_, entry) in message_map.as_object().unwrap_or_default() {
            match message_record(graph, entry) {
                Ok(message) => record.messages.push(message),
                Err(e) => record.rejected.push(e),
            }
        }
        Ok(record)
    }
}

fn message_record(graph: &DecodedGraph, entry: &DecodedValue) -> Result<MessageRecord> {
    let message = as_object(graph, entry)?;
    Ok(MessageRecord {
        conversation_id: required_str(graph, message, "conversationId")?,
        timestamp: optional_time(graph, message, "originalArrivalTime")
            .unwrap_or(DateTime::UNIX_EPOCH),
        from: optional_str(graph, message, "from").unwrap_or_default(),
        display_name: optional_str(graph, message, "imDisplayName"),
        content: optional_str(graph, message, "content").unwrap_or_default(),
        message_type: optional_str(graph, message, "messageType").unwrap_or_default(),
    })
}
