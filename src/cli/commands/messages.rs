//! Message subcommands.

use clap::Args;

use crate::cache::TeamsCache;
use crate::cli::format;
use crate::cli::{GlobalArgs, OutputSink, Result};

/// Arguments for the messages command.
#[derive(Args, Debug)]
pub struct MessagesArgs {
    /// Conversation id.
    pub id: String,

    /// Include ThreadActivity system messages.
    #[arg(long)]
    pub include_system: bool,

    #[command(flatten)]
    pub output: OutputSink,
}

impl MessagesArgs {
    pub async fn run(self, cache: &TeamsCache, global: &GlobalArgs) -> Result<()> {
        let messages = cache.get_messages(&self.id, self.include_system).await?;
        self.output
            .write(&messages, global.json, |m| format::messages(m))
            .await?;
        Ok(())
    }
}

/// Arguments for the search command.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Text to look for (case-insensitive).
    pub query: String,

    /// Only messages whose sender name contains this text.
    #[arg(long = "from")]
    pub from_user: Option<String>,

    /// Maximum number of matches.
    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub output: OutputSink,
}

impl SearchArgs {
    pub async fn run(self, cache: &TeamsCache, global: &GlobalArgs) -> Result<()> {
        let matches = cache
            .search_messages(&self.query, self.from_user.as_deref(), self.limit)
            .await?;
        self.output
            .write(&matches, global.json, |m| format::search_matches(m))
            .await?;
        Ok(())
    }
}

/// Arguments for the call-history command.
#[derive(Args, Debug)]
pub struct CallHistoryArgs {
    /// Maximum number of calls.
    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub output: OutputSink,
}

impl CallHistoryArgs {
    pub async fn run(self, cache: &TeamsCache, global: &GlobalArgs) -> Result<()> {
        let calls = cache.get_call_history(self.limit).await?;
        self.output
            .write(&calls, global.json, |c| format::calls(c))
            .await?;
        Ok(())
    }
}
