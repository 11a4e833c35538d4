//! Query results built from the indices: search hits, call records, summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Conversation, Message, Participant};

/// A message matching a text search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMatch {
    pub conversation_id: String,
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub content: String,
    pub match_snippet: String,
}

/// A call event from a call-log thread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    pub conversation_id: String,
    pub timestamp: DateTime<Utc>,
    pub participants: Vec<Participant>,
    pub details: String,
}

/// A conversation together with its ordered messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationHistory {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Counters collected while building the indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildDiagnostics {
    pub files_read: usize,
    pub files_skipped: usize,
    pub records_read: usize,
    pub corrupt_entries: usize,
    pub live_keys: usize,
    pub stores_scanned: usize,
    pub values_decoded: usize,
    /// Records not projected, by reason.
    pub values_skipped: BTreeMap<String, usize>,
    pub conversations_projected: usize,
    pub messages_projected: usize,
}

impl BuildDiagnostics {
    pub fn record_skip(&mut self, reason: &str) {
        *self.values_skipped.entry(reason.to_string()).or_default() += 1;
    }

    pub fn skipped_total(&self) -> usize {
        self.values_skipped.values().sum()
    }

    /// True when data was present but nothing could be projected from it.
    pub fn nothing_recovered(&self) -> bool {
        self.conversations_projected == 0
            && self.messages_projected == 0
            && (self.values_decoded > 0 || self.skipped_total() > 0)
    }
}

/// Overall counts for the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub conversation_count: usize,
    pub message_count: usize,
    pub participant_count: usize,
    pub cache_path: String,
    pub diagnostics: BuildDiagnostics,
}

/// Summary plus the message count of one sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    #[serde(flatten)]
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message_count: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_recovered() {
        let mut diagnostics = BuildDiagnostics::default();
        assert!(!diagnostics.nothing_recovered());

        diagnostics.record_skip("unsupported_tag");
        diagnostics.record_skip("unsupported_tag");
        assert_eq!(diagnostics.skipped_total(), 2);
        assert!(diagnostics.nothing_recovered());

        diagnostics.conversations_projected = 1;
        assert!(!diagnostics.nothing_recovered());
    }
}
