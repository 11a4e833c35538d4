//! Command-line argument definitions and helpers.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::ConfigSource;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during argument processing.
#[derive(Debug, Error)]
pub enum ArgsError {
    /// I/O error writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for argument operations.
pub type Result<T> = std::result::Result<T, ArgsError>;

// =============================================================================
// Global Arguments
// =============================================================================

/// Global arguments that apply to all commands.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Path to the main configuration file.
    #[arg(long = "config-file", global = true)]
    pub config_file: Option<PathBuf>,

    /// Path to the configuration overrides file.
    #[arg(long = "config-file-overrides", global = true)]
    pub config_file_overrides: Option<PathBuf>,

    /// Configuration overrides in the form section.key=value.
    #[arg(long = "config", value_parser = parse_config_override, global = true)]
    pub config_overrides: Vec<(String, String)>,

    /// LevelDB directory to read instead of the configured or detected one.
    #[arg(long = "cache-path", global = true)]
    pub cache_path: Option<PathBuf>,

    /// Format output as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Log build progress to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Convert to a ConfigSource for reading configuration.
    ///
    /// `--cache-path` is applied as the last override.
    pub fn to_config_source(&self) -> ConfigSource {
        let mut overrides = self.config_overrides.clone();
        if let Some(path) = &self.cache_path {
            overrides.push(("cache.path".to_string(), path.display().to_string()));
        }
        ConfigSource {
            config_file: self.config_file.clone(),
            override_file: self.config_file_overrides.clone(),
            overrides,
        }
    }
}

/// Parse a config override from "name=value" format.
fn parse_config_override(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid config override '{}': expected name=value", s))?;
    Ok((name.to_string(), value.to_string()))
}

// =============================================================================
// Output
// =============================================================================

/// Helper for commands that write output to a file or stdout.
#[derive(Args, Debug, Default)]
pub struct OutputSink {
    /// Write output to this file instead of stdout.
    #[arg(id = "output_file", short = 'o', long = "output-file")]
    pub file: Option<PathBuf>,
}

impl OutputSink {
    /// Write a string value to the output.
    pub async fn write_str(&self, value: &str) -> Result<()> {
        match &self.file {
            Some(path) => {
                tokio::fs::write(path, value).await?;
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(value.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }
        Ok(())
    }

    /// Write `value` as pretty JSON, or as the text produced by `text`.
    pub async fn write<T, F>(&self, value: &T, json: bool, text: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&T) -> String,
    {
        let output = if json {
            serde_json::to_string_pretty(value)?
        } else {
            text(value)
        };
        self.write_str(output.trim_end()).await
    }
}
