use std::collections::BTreeMap;

use crate::model::{BuildDiagnostics, Conversation, Message};

/// The three indices built by one complete pass over the cache.
///
/// Immutable once built; every query reads from it concurrently.
#[derive(Debug, Clone, Default)]
pub struct CacheIndex {
    conversations: BTreeMap<String, Conversation>,
    messages: BTreeMap<String, Vec<Message>>,
    participants: BTreeMap<String, String>,
    diagnostics: BuildDiagnostics,
}

impl CacheIndex {
    pub fn new(
        conversations: BTreeMap<String, Conversation>,
        messages: BTreeMap<String, Vec<Message>>,
        participants: BTreeMap<String, String>,
        diagnostics: BuildDiagnostics,
    ) -> Self {
        Self {
            conversations,
            messages,
            participants,
            diagnostics,
        }
    }

    /// Conversations in id order.
    pub fn conversations(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.values()
    }

    pub fn conversation(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    /// Messages of one conversation, oldest first.
    pub fn messages(&self, conversation_id: &str) -> &[Message] {
        self.messages
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every message list keyed by conversation id, in id order.
    pub fn all_messages(&self) -> impl Iterator<Item = (&str, &[Message])> {
        self.messages
            .iter()
            .map(|(id, messages)| (id.as_str(), messages.as_slice()))
    }

    pub fn message_count(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }

    /// Participant display names keyed by normalized user id.
    pub fn participants(&self) -> &BTreeMap<String, String> {
        &self.participants
    }

    pub fn display_name(&self, user_id: &str) -> Option<&str> {
        self.participants.get(user_id).map(String::as_str)
    }

    pub fn diagnostics(&self) -> &BuildDiagnostics {
        &self.diagnostics
    }
}
