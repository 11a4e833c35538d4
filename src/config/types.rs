//! Configuration types for teams-cache-rs.
//!
//! This module defines the structures used to represent application configuration
//! as parsed from an INI-format config file.

use std::path::PathBuf;

// =============================================================================
// Config Sections
// =============================================================================

/// [cache] section - where the LevelDB directory lives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Explicit store directory. When unset the platform locations are probed.
    pub path: Option<PathBuf>,
}

/// [stores] section - which object stores are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoresConfig {
    pub of_interest: Vec<String>,
}

/// [query] section - default limits for query operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    pub search_limit: usize,
    pub list_limit: usize,
    pub call_limit: usize,
    /// Maximum characters of rendered content in a search snippet.
    pub snippet_length: usize,
}

/// [decode] section - how the build pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Decode object stores concurrently.
    pub parallel: bool,
}

// =============================================================================
// Top-Level Config
// =============================================================================

/// Complete application configuration as parsed from config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cache: CacheConfig,
    pub stores: StoresConfig,
    pub query: QueryConfig,
    pub decode: DecodeConfig,
}
