//! Command-line interface for the Teams cache reader.

pub mod args;
mod commands;
mod format;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::cache::{CacheError, TeamsCache};
use crate::config::{read_config, ConfigHelper};

pub use args::{GlobalArgs, OutputSink};

use commands::conversations::{
    GetConversationArgs, ListConversationsArgs, ParticipantsArgs, SearchByParticipantArgs,
};
use commands::messages::{CallHistoryArgs, MessagesArgs, SearchArgs};
use commands::stats::{DirectoryArgs, SummaryArgs, UserStatsArgs};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during CLI execution.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument or output error.
    #[error("{0}")]
    Args(#[from] args::ArgsError),

    /// Cache error.
    #[error("{0}")]
    Cache(#[from] CacheError),

    /// A requested item does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound(_) => 2,
            CliError::Cache(CacheError::CacheNotFound { .. })
            | CliError::Cache(CacheError::UnsupportedPlatform(_)) => 3,
            _ => 1,
        }
    }
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

// =============================================================================
// CLI Definition
// =============================================================================

/// tcache - Query the Teams desktop client's local cache.
#[derive(Parser, Debug)]
#[command(name = "tcache", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Overall counts and build diagnostics.
    Summary(SummaryArgs),

    /// List conversations.
    #[command(name = "list-conversations")]
    ListConversations(ListConversationsArgs),

    /// Show one conversation with its messages.
    #[command(name = "get-conversation")]
    GetConversation(GetConversationArgs),

    /// Show the messages of one conversation.
    Messages(MessagesArgs),

    /// Search message text.
    Search(SearchArgs),

    /// List call events.
    #[command(name = "call-history")]
    CallHistory(CallHistoryArgs),

    /// List the members of a conversation.
    Participants(ParticipantsArgs),

    /// Find conversations by member name.
    #[command(name = "search-by-participant")]
    SearchByParticipant(SearchByParticipantArgs),

    /// Summary plus one user's message count.
    #[command(name = "user-stats")]
    UserStats(UserStatsArgs),

    /// Every known participant.
    Directory(DirectoryArgs),
}

// =============================================================================
// CLI Execution
// =============================================================================

impl Cli {
    /// Parse command-line arguments and return the CLI instance.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Open the cache described by the global arguments.
    pub fn open_cache(&self) -> Result<TeamsCache> {
        let config_result = read_config(&self.global.to_config_source())
            .map_err(|e| CacheError::Config(e.to_string()))?;
        for warning in &config_result.warnings {
            tracing::warn!("{}", warning);
        }

        let config = ConfigHelper::new(config_result.config);
        Ok(TeamsCache::open(&config)?)
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let cache = self.open_cache()?;
        let global = &self.global;

        match self.command {
            Command::Summary(args) => args.run(&cache, global).await,
            Command::ListConversations(args) => args.run(&cache, global).await,
            Command::GetConversation(args) => args.run(&cache, global).await,
            Command::Messages(args) => args.run(&cache, global).await,
            Command::Search(args) => args.run(&cache, global).await,
            Command::CallHistory(args) => args.run(&cache, global).await,
            Command::Participants(args) => args.run(&cache, global).await,
            Command::SearchByParticipant(args) => args.run(&cache, global).await,
            Command::UserStats(args) => args.run(&cache, global).await,
            Command::Directory(args) => args.run(&cache, global).await,
        }
    }
}
