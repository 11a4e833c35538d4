//! Summary and directory subcommands.

use clap::Args;

use crate::cache::TeamsCache;
use crate::cli::format;
use crate::cli::{GlobalArgs, OutputSink, Result};

/// Arguments for the summary command.
#[derive(Args, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub output: OutputSink,
}

impl SummaryArgs {
    pub async fn run(self, cache: &TeamsCache, global: &GlobalArgs) -> Result<()> {
        let summary = cache.get_summary().await?;
        self.output
            .write(&summary, global.json, format::summary)
            .await?;
        Ok(())
    }
}

/// Arguments for the user-stats command.
#[derive(Args, Debug)]
pub struct UserStatsArgs {
    /// Count messages from senders whose name contains this text.
    pub user_name: Option<String>,

    #[command(flatten)]
    pub output: OutputSink,
}

impl UserStatsArgs {
    pub async fn run(self, cache: &TeamsCache, global: &GlobalArgs) -> Result<()> {
        let stats = cache.get_user_stats(self.user_name.as_deref()).await?;
        self.output
            .write(&stats, global.json, format::user_stats)
            .await?;
        Ok(())
    }
}

/// Arguments for the directory command.
#[derive(Args, Debug)]
pub struct DirectoryArgs {
    #[command(flatten)]
    pub output: OutputSink,
}

impl DirectoryArgs {
    pub async fn run(self, cache: &TeamsCache, global: &GlobalArgs) -> Result<()> {
        let directory = cache.participant_directory().await?;
        self.output
            .write(&directory, global.json, |d| format::directory(d))
            .await?;
        Ok(())
    }
}
