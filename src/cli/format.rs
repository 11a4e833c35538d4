//! Markdown-style text output for the non-JSON mode.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::model::{
    CallRecord, Conversation, ConversationHistory, Message, Participant, SearchMatch, Summary,
    UserStats,
};

fn time(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn conversation_type(conversation: &Conversation) -> &str {
    conversation
        .conversation_type
        .as_ref()
        .map_or("Unknown", |t| t.as_str())
}

fn participant_names(participants: &[Participant]) -> String {
    participants
        .iter()
        .map(|p| p.display_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn summary(summary: &Summary) -> String {
    let d = &summary.diagnostics;
    let mut out = String::from("# Teams Cache Summary\n\n");
    let _ = writeln!(out, "**Total Conversations:** {}", summary.conversation_count);
    let _ = writeln!(out, "**Total Messages:** {}", summary.message_count);
    let _ = writeln!(out, "**Total Users:** {}", summary.participant_count);
    let _ = writeln!(out, "\n**Cache Location:** {}", summary.cache_path);
    let _ = writeln!(
        out,
        "\n_{} files read, {} records, {} live keys, {} values decoded, {} skipped_",
        d.files_read,
        d.records_read,
        d.live_keys,
        d.values_decoded,
        d.skipped_total()
    );
    for (reason, count) in &d.values_skipped {
        let _ = writeln!(out, "- {}: {}", reason, count);
    }
    if d.nothing_recovered() {
        out.push_str(
            "\n**Warning:** the store holds data but no conversations could be recovered.\n",
        );
    }
    out
}

pub fn user_stats(stats: &UserStats) -> String {
    let mut out = summary(&stats.summary);
    if let (Some(name), Some(count)) = (&stats.user_name, stats.user_message_count) {
        let _ = writeln!(out, "\n**Messages from {}:** {}", name, count);
    }
    out
}

pub fn conversations(conversations: &[Conversation]) -> String {
    let mut out = String::from("# Teams Conversations\n\n");
    for conversation in conversations {
        let _ = writeln!(out, "## {}", conversation.display_title());
        let _ = writeln!(out, "- **Type:** {}", conversation_type(conversation));
        let _ = writeln!(out, "- **ID:** {}", conversation.id);
        let _ = writeln!(out, "- **Messages:** {}", conversation.message_count);
        let _ = writeln!(out, "- **Participants:** {}", conversation.members.len());
        if let Some(last) = &conversation.last_message_time {
            let _ = writeln!(out, "- **Last Activity:** {}", time(last));
        }
        out.push('\n');
    }
    out
}

pub fn conversation(conversation: &Conversation) -> String {
    let mut out = conversations(std::slice::from_ref(conversation));
    if !conversation.members.is_empty() {
        out.push_str("### Members\n");
        out.push_str(&participants(&conversation.members));
    }
    out
}

pub fn messages(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        let _ = writeln!(
            out,
            "[{}] **{}**: {}",
            time(&message.timestamp),
            message.sender,
            message.content
        );
    }
    out
}

pub fn history(history: &ConversationHistory) -> String {
    let mut out = conversation(&history.conversation);
    out.push_str("\n### Messages\n");
    out.push_str(&messages(&history.messages));
    out
}

pub fn search_matches(matches: &[SearchMatch]) -> String {
    let mut out = format!("# {} matches\n\n", matches.len());
    for m in matches {
        let _ = writeln!(
            out,
            "- [{}] **{}** in `{}`: {}",
            time(&m.timestamp),
            m.sender,
            m.conversation_id,
            m.match_snippet
        );
    }
    out
}

pub fn calls(calls: &[CallRecord]) -> String {
    let mut out = String::from("# Call History\n\n");
    for call in calls {
        let _ = writeln!(
            out,
            "- [{}] {} ({})",
            time(&call.timestamp),
            participant_names(&call.participants),
            call.details
        );
    }
    out
}

pub fn participants(participants: &[Participant]) -> String {
    let mut out = String::new();
    for p in participants {
        let _ = writeln!(out, "- **{}** (`{}`)", p.display_name, p.id);
    }
    out
}

pub fn directory(directory: &[Participant]) -> String {
    format!("# Teams Participants Directory\n\n{}", participants(directory))
}
