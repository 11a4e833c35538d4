//! Read-only operations over a built [`CacheIndex`].

use std::sync::Arc;

use crate::model::{
    CallRecord, Conversation, ConversationHistory, ConversationType, Message, Participant,
    SearchMatch, Summary, UserStats,
};
use crate::projector::CacheIndex;
use crate::render::TextRenderer;

use super::text::{contains_ignore_case, find_ignore_case, snippet};

/// Default maximum length of a search snippet, in characters.
pub const DEFAULT_SNIPPET_LENGTH: usize = 200;

/// Queries over a completed index.
///
/// Conversations are visited in id order and messages in timestamp order, so
/// limited results are deterministic.
#[derive(Clone)]
pub struct QueryEngine {
    index: Arc<CacheIndex>,
    renderer: Arc<dyn TextRenderer>,
    cache_path: String,
    snippet_length: usize,
}

impl QueryEngine {
    pub fn new(
        index: Arc<CacheIndex>,
        renderer: Arc<dyn TextRenderer>,
        cache_path: impl Into<String>,
    ) -> Self {
        Self {
            index,
            renderer,
            cache_path: cache_path.into(),
            snippet_length: DEFAULT_SNIPPET_LENGTH,
        }
    }

    pub fn with_snippet_length(mut self, snippet_length: usize) -> Self {
        self.snippet_length = snippet_length;
        self
    }

    pub fn index(&self) -> &CacheIndex {
        &self.index
    }

    /// Content as shown to users: rich-text bodies rendered, everything else verbatim.
    fn rendered_content(&self, message: &Message) -> String {
        if message.is_rich_text() && !message.content.is_empty() {
            self.renderer.render_text(&message.content)
        } else {
            message.content.clone()
        }
    }

    fn rendered(&self, message: &Message) -> Message {
        Message {
            content: self.rendered_content(message),
            ..message.clone()
        }
    }

    fn conversations_of_type<'a>(
        &'a self,
        type_filter: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Conversation> + 'a {
        self.index
            .conversations()
            .filter(move |c| type_filter.map_or(true, |t| c.has_type(t)))
    }

    // =========================================================================
    // Conversations
    // =========================================================================

    pub fn list_conversations(
        &self,
        type_filter: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<Conversation> {
        self.conversations_of_type(type_filter)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub fn get_conversation(&self, id: &str) -> Option<Conversation> {
        self.index.conversation(id).cloned()
    }

    /// Messages of a conversation, oldest first.
    ///
    /// `ThreadActivity/` messages are only included when `include_system` is set.
    pub fn get_messages(&self, conversation_id: &str, include_system: bool) -> Vec<Message> {
        self.index
            .messages(conversation_id)
            .iter()
            .filter(|m| include_system || !m.is_system())
            .map(|m| self.rendered(m))
            .collect()
    }

    /// A conversation with its messages, or `None` if the id is unknown.
    pub fn conversation_history(
        &self,
        conversation_id: &str,
        include_system: bool,
    ) -> Option<ConversationHistory> {
        let conversation = self.get_conversation(conversation_id)?;
        Some(ConversationHistory {
            conversation,
            messages: self.get_messages(conversation_id, include_system),
        })
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Case-insensitive substring search over rendered message content.
    ///
    /// `from_user` filters on the sender's display name, also case-insensitively.
    pub fn search_messages(
        &self,
        query: &str,
        from_user: Option<&str>,
        limit: usize,
    ) -> Vec<SearchMatch> {
        let mut matches = Vec::new();
        if limit == 0 {
            return matches;
        }

        for (conversation_id, messages) in self.index.all_messages() {
            for message in messages {
                if let Some(user) = from_user {
                    if !contains_ignore_case(&message.sender, user) {
                        continue;
                    }
                }

                let content = self.rendered_content(message);
                if content.is_empty() {
                    continue;
                }
                let Some((start, end)) = find_ignore_case(&content, query) else {
                    continue;
                };

                matches.push(SearchMatch {
                    conversation_id: conversation_id.to_string(),
                    timestamp: message.timestamp,
                    sender: message.sender.clone(),
                    match_snippet: snippet(&content, start, end, self.snippet_length),
                    content,
                });
                if matches.len() >= limit {
                    return matches;
                }
            }
        }

        matches
    }

    /// Call events from `Thread` conversations.
    pub fn get_call_history(&self, limit: usize) -> Vec<CallRecord> {
        let mut calls = Vec::new();
        if limit == 0 {
            return calls;
        }

        let thread = ConversationType::Thread;
        for conversation in self.conversations_of_type(Some(thread.as_str())) {
            for message in self.index.messages(&conversation.id) {
                let content = self.rendered_content(message);
                if !message.is_call_event() && !contains_ignore_case(&content, "call") {
                    continue;
                }
                calls.push(CallRecord {
                    conversation_id: conversation.id.clone(),
                    timestamp: message.timestamp,
                    participants: conversation.members.clone(),
                    details: content,
                });
                if calls.len() >= limit {
                    return calls;
                }
            }
        }

        calls
    }

    // =========================================================================
    // Participants
    // =========================================================================

    /// Members of a conversation; empty when the id is unknown.
    pub fn get_participants(&self, conversation_id: &str) -> Vec<Participant> {
        self.index
            .conversation(conversation_id)
            .map(|c| c.members.clone())
            .unwrap_or_default()
    }

    /// Conversations with a member whose display name contains `name_part`.
    pub fn search_by_participant(
        &self,
        name_part: &str,
        type_filter: Option<&str>,
    ) -> Vec<Conversation> {
        self.conversations_of_type(type_filter)
            .filter(|c| {
                c.members
                    .iter()
                    .any(|m| contains_ignore_case(&m.display_name, name_part))
            })
            .cloned()
            .collect()
    }

    /// Every known participant, ordered by display name.
    pub fn participant_directory(&self) -> Vec<Participant> {
        let mut directory: Vec<Participant> = self
            .index
            .participants()
            .iter()
            .map(|(id, name)| Participant::new(id.as_str(), name.as_str()))
            .collect();
        directory.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.id.cmp(&b.id))
        });
        directory
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    pub fn get_summary(&self) -> Summary {
        Summary {
            conversation_count: self.index.conversations().count(),
            message_count: self.index.message_count(),
            participant_count: self.index.participants().len(),
            cache_path: self.cache_path.clone(),
            diagnostics: self.index.diagnostics().clone(),
        }
    }

    /// Summary, plus the number of messages sent by users matching `user_name`.
    pub fn get_user_stats(&self, user_name: Option<&str>) -> UserStats {
        let user_message_count = user_name.map(|name| {
            self.index
                .all_messages()
                .flat_map(|(_, messages)| messages.iter())
                .filter(|m| contains_ignore_case(&m.sender, name))
                .count()
        });

        UserStats {
            summary: self.get_summary(),
            user_name: user_name.map(str::to_string),
            user_message_count,
        }
    }
}
