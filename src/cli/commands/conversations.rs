//! Conversation subcommands.

use clap::Args;

use crate::cache::TeamsCache;
use crate::cli::format;
use crate::cli::{CliError, GlobalArgs, OutputSink, Result};

// =============================================================================
// ListConversations
// =============================================================================

/// Arguments for the list-conversations command.
#[derive(Args, Debug)]
pub struct ListConversationsArgs {
    /// Only conversations of this type (Chat, Meeting, Space, Topic, Thread).
    #[arg(long = "type")]
    pub type_filter: Option<String>,

    /// Maximum number of conversations.
    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub output: OutputSink,
}

impl ListConversationsArgs {
    pub async fn run(self, cache: &TeamsCache, global: &GlobalArgs) -> Result<()> {
        let conversations = cache
            .list_conversations(self.type_filter.as_deref(), self.limit)
            .await?;
        self.output
            .write(&conversations, global.json, |c| format::conversations(c))
            .await?;
        Ok(())
    }
}

// =============================================================================
// GetConversation
// =============================================================================

/// Arguments for the get-conversation command.
#[derive(Args, Debug)]
pub struct GetConversationArgs {
    /// Conversation id.
    pub id: String,

    /// Include ThreadActivity system messages.
    #[arg(long)]
    pub include_system: bool,

    #[command(flatten)]
    pub output: OutputSink,
}

impl GetConversationArgs {
    pub async fn run(self, cache: &TeamsCache, global: &GlobalArgs) -> Result<()> {
        let history = cache
            .conversation_history(&self.id, self.include_system)
            .await?
            .ok_or_else(|| CliError::NotFound(format!("conversation {} not found", self.id)))?;
        self.output
            .write(&history, global.json, format::history)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Participants
// =============================================================================

/// Arguments for the participants command.
#[derive(Args, Debug)]
pub struct ParticipantsArgs {
    /// Conversation id.
    pub id: String,

    #[command(flatten)]
    pub output: OutputSink,
}

impl ParticipantsArgs {
    pub async fn run(self, cache: &TeamsCache, global: &GlobalArgs) -> Result<()> {
        let participants = cache.get_participants(&self.id).await?;
        self.output
            .write(&participants, global.json, |p| format::participants(p))
            .await?;
        Ok(())
    }
}

// =============================================================================
// SearchByParticipant
// =============================================================================

/// Arguments for the search-by-participant command.
#[derive(Args, Debug)]
pub struct SearchByParticipantArgs {
    /// Part of a participant's display name (case-insensitive).
    pub name: String,

    /// Only conversations of this type.
    #[arg(long = "type")]
    pub type_filter: Option<String>,

    #[command(flatten)]
    pub output: OutputSink,
}

impl SearchByParticipantArgs {
    pub async fn run(self, cache: &TeamsCache, global: &GlobalArgs) -> Result<()> {
        let conversations = cache
            .search_by_participant(&self.name, self.type_filter.as_deref())
            .await?;
        self.output
            .write(&conversations, global.json, |c| format::conversations(c))
            .await?;
        Ok(())
    }
}
