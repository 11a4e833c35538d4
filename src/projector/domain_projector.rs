//! Builds the conversation, message and participant indices.

use std::collections::BTreeMap;

use crate::model::{BuildDiagnostics, Conversation, Message, Participant, UNKNOWN_SENDER};
use crate::value::DecodedGraph;

use super::cache_index::CacheIndex;
use super::error::ProjectionError;
use super::schema::{ConversationRecord, MessageRecord, ReplyChainRecord};

pub const CONVERSATIONS_STORE: &str = "conversations";
pub const REPLYCHAINS_STORE: &str = "replychains";
pub const PEOPLE_STORE: &str = "people";
pub const BUDDYLIST_STORE: &str = "buddylist";

const WORKER_PREFIX: &str = "worker/";
const CONTACTS_SEGMENT: &str = "/contacts/";

/// Strip transport decorations from a user id.
///
/// `worker/8:orgid:abc` and `https://host/v1/users/ME/contacts/8:orgid:abc`
/// both normalize to `8:orgid:abc`.
pub fn normalize_user_id(id: &str) -> &str {
    let id = id.strip_prefix(WORKER_PREFIX).unwrap_or(id);
    match id.rfind(CONTACTS_SEGMENT) {
        Some(pos) => &id[pos + CONTACTS_SEGMENT.len()..],
        None => id,
    }
}

/// Accumulates decoded values in scan order and produces a [`CacheIndex`].
///
/// Later conversation rows with the same id replace earlier ones, and later
/// display names for a user id replace earlier ones.
#[derive(Debug, Default)]
pub struct DomainProjector {
    conversations: BTreeMap<String, ConversationRecord>,
    messages: BTreeMap<String, Vec<MessageRecord>>,
    participants: BTreeMap<String, String>,
    diagnostics: BuildDiagnostics,
}

impl DomainProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from counters gathered by earlier build stages.
    pub fn with_diagnostics(diagnostics: BuildDiagnostics) -> Self {
        Self {
            diagnostics,
            ..Self::default()
        }
    }

    /// Count a record that never reached the projector.
    pub fn record_skip(&mut self, reason: &str) {
        self.diagnostics.record_skip(reason);
    }

    /// Project one decoded value from `store`.
    pub fn project(&mut self, store: &str, graph: &DecodedGraph) {
        let result = match store {
            CONVERSATIONS_STORE => self.project_conversation(graph),
            REPLYCHAINS_STORE => self.project_reply_chain(graph),
            PEOPLE_STORE | BUDDYLIST_STORE => Ok(()),
            other => {
                tracing::debug!("no projection for store '{}'", other);
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::warn!("skipping {} record: {}", store, e);
            self.diagnostics.record_skip(e.kind());
        }
    }

    fn learn_name(&mut self, id: &str, name: Option<&str>) {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.participants
                .insert(normalize_user_id(id).to_string(), name.to_string());
        }
    }

    fn project_conversation(&mut self, graph: &DecodedGraph) -> Result<(), ProjectionError> {
        let record = ConversationRecord::from_graph(graph)?;

        for member in &record.members {
            self.learn_name(&member.id, member.display_name.as_deref());
        }
        if let Some(last) = &record.last_message {
            if let Some(from) = last.from.as_deref() {
                self.learn_name(from, last.display_name.as_deref());
            }
        }

        self.conversations.insert(record.id.clone(), record);
        Ok(())
    }

    fn project_reply_chain(&mut self, graph: &DecodedGraph) -> Result<(), ProjectionError> {
        let chain = ReplyChainRecord::from_graph(graph)?;

        for e in &chain.rejected {
            tracing::warn!("skipping reply-chain message: {}", e);
            self.diagnostics.record_skip(e.kind());
        }
        for message in chain.messages {
            self.learn_name(&message.from, message.display_name.as_deref());
            self.messages
                .entry(message.conversation_id.clone())
                .or_default()
                .push(message);
        }
        Ok(())
    }

    fn resolve_sender(&self, message: &MessageRecord) -> String {
        message
            .display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.participants
                    .get(normalize_user_id(&message.from))
                    .map(String::as_str)
            })
            .unwrap_or(UNKNOWN_SENDER)
            .to_string()
    }

    /// Resolve names, order messages and publish the indices.
    pub fn finish(self) -> CacheIndex {
        let mut messages: BTreeMap<String, Vec<Message>> = BTreeMap::new();
        for (conversation_id, records) in &self.messages {
            let mut list: Vec<Message> = records
                .iter()
                .map(|record| Message {
                    conversation_id: record.conversation_id.clone(),
                    timestamp: record.timestamp,
                    sender: self.resolve_sender(record),
                    sender_id: normalize_user_id(&record.from).to_string(),
                    content: record.content.clone(),
                    message_type: record.message_type.clone(),
                })
                .collect();
            // Stable: equal timestamps keep encounter order.
            list.sort_by_key(|m| m.timestamp);
            messages.insert(conversation_id.clone(), list);
        }

        let conversations: BTreeMap<String, Conversation> = self
            .conversations
            .values()
            .map(|record| {
                let members = record
                    .members
                    .iter()
                    .map(|member| {
                        let id = normalize_user_id(&member.id);
                        let name = self
                            .participants
                            .get(id)
                            .cloned()
                            .or_else(|| member.display_name.clone())
                            .unwrap_or_else(|| id.to_string());
                        Participant::new(id, name)
                    })
                    .collect();

                let conversation = Conversation {
                    id: record.id.clone(),
                    conversation_type: record.conversation_type.clone(),
                    title: record.title.clone(),
                    members,
                    message_count: messages.get(&record.id).map_or(0, Vec::len),
                    last_message_time: record.last_message.as_ref().and_then(|l| l.arrival),
                };
                (record.id.clone(), conversation)
            })
            .collect();

        let mut diagnostics = self.diagnostics;
        diagnostics.conversations_projected = conversations.len();
        diagnostics.messages_projected = messages.values().map(Vec::len).sum();

        tracing::info!(
            "projected {} conversations, {} messages, {} participants",
            diagnostics.conversations_projected,
            diagnostics.messages_projected,
            self.participants.len()
        );

        CacheIndex::new(conversations, messages, self.participants, diagnostics)
    }
}
