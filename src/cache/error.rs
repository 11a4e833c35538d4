//! Errors surfaced by the cache facade.

use std::path::PathBuf;

use thiserror::Error;

use crate::leveldb::LevelDbError;

/// Errors that prevent the cache from being built.
///
/// Cloneable so a recorded build failure can be replayed to later callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// No cache directory exists at any of the probed locations.
    #[error("Teams cache not found; searched: {}", display_paths(.searched))]
    CacheNotFound { searched: Vec<PathBuf> },

    /// Cache discovery has no known locations for this operating system.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Configuration could not be read or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The LevelDB store is missing or unreadable as a whole.
    #[error("store error: {0}")]
    Store(String),

    /// The build pass failed after the store was read.
    #[error("build failed: {0}")]
    Build(String),
}

impl From<LevelDbError> for CacheError {
    fn from(e: LevelDbError) -> Self {
        CacheError::Store(e.to_string())
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "(no home directory)".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
