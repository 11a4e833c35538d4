//! Configuration file reading and parsing.
//!
//! This module handles locating, reading, and parsing INI-format configuration files,
//! with support for layered overrides.

use std::env;
use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use thiserror::Error;

use super::{CacheConfig, Config, DecodeConfig, QueryConfig, StoresConfig};

// =============================================================================
// Constants - Default Values
// =============================================================================

const DEFAULT_STORES_OF_INTEREST: &str = "replychains,conversations,people,buddylist";
const DEFAULT_SEARCH_LIMIT: usize = 50;
const DEFAULT_LIST_LIMIT: usize = 100;
const DEFAULT_CALL_LIMIT: usize = 50;
const DEFAULT_SNIPPET_LENGTH: usize = 200;
const DEFAULT_DECODE_PARALLEL: bool = true;

const ENV_CONFIG_FILE: &str = "TEAMS_CACHE_CONFIG_FILE";
const DEFAULT_CONFIG_FILENAME: &str = ".teamscacheconfig";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid integer '{value}' for key '{key}': {source}")]
    InvalidInteger {
        key: String,
        value: String,
        source: std::num::ParseIntError,
    },

    #[error("invalid boolean '{value}' for key '{key}'")]
    InvalidBoolean { key: String, value: String },

    #[error("invalid override key '{key}': {message}")]
    InvalidOverrideKey { key: String, message: String },
}

/// Result type for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

// =============================================================================
// ConfigSource
// =============================================================================

/// Specifies how to locate and layer configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    /// Explicit config file path from CLI. If specified and doesn't exist, error.
    /// If None, fall back to TEAMS_CACHE_CONFIG_FILE env var, then ~/.teamscacheconfig.
    pub config_file: Option<PathBuf>,

    /// Additional override config file (layered on top of base config).
    pub override_file: Option<PathBuf>,

    /// Individual key=value overrides (applied last).
    /// Keys use dot-notation: "cache.path", "query.search_limit"
    pub overrides: Vec<(String, String)>,
}

// =============================================================================
// Value Parsing
// =============================================================================

fn parse_usize_value(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::InvalidInteger {
            key: key.to_string(),
            value: value.to_string(),
            source: e,
        })
}

fn parse_bool_value(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBoolean {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parse a comma-separated string into a Vec of trimmed strings.
fn parse_comma_separated(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// =============================================================================
// Config File Resolution
// =============================================================================

/// Information about how the config file was resolved.
#[derive(Debug)]
pub struct ResolvedConfigFile {
    /// The path to the config file, if one was found.
    pub path: Option<PathBuf>,
    /// Warning message if env var pointed to nonexistent file.
    pub warning: Option<String>,
}

/// Resolve which config file to use based on the ConfigSource and environment.
fn resolve_config_file(source: &ConfigSource) -> Result<ResolvedConfigFile> {
    // If explicit path provided, it must exist
    if let Some(ref path) = source.config_file {
        if path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(path.clone()),
                warning: None,
            });
        } else {
            return Err(ConfigError::FileNotFound(path.clone()));
        }
    }

    if let Ok(env_path) = env::var(ENV_CONFIG_FILE) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(path),
                warning: None,
            });
        } else {
            // Warn but continue with defaults
            return Ok(ResolvedConfigFile {
                path: None,
                warning: Some(format!(
                    "config file specified by {} does not exist: {}",
                    ENV_CONFIG_FILE, env_path
                )),
            });
        }
    }

    if let Some(home) = home_dir() {
        let default_path = home.join(DEFAULT_CONFIG_FILENAME);
        if default_path.exists() {
            return Ok(ResolvedConfigFile {
                path: Some(default_path),
                warning: None,
            });
        }
    }

    Ok(ResolvedConfigFile {
        path: None,
        warning: None,
    })
}

/// Get the user's home directory.
pub(crate) fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

// =============================================================================
// Default Config
// =============================================================================

/// Create a Config with all default values.
pub(crate) fn default_config() -> Config {
    Config {
        cache: CacheConfig { path: None },
        stores: StoresConfig {
            of_interest: parse_comma_separated(DEFAULT_STORES_OF_INTEREST),
        },
        query: QueryConfig {
            search_limit: DEFAULT_SEARCH_LIMIT,
            list_limit: DEFAULT_LIST_LIMIT,
            call_limit: DEFAULT_CALL_LIMIT,
            snippet_length: DEFAULT_SNIPPET_LENGTH,
        },
        decode: DecodeConfig {
            parallel: DEFAULT_DECODE_PARALLEL,
        },
    }
}

// =============================================================================
// INI Parsing
// =============================================================================

/// Apply an INI file's contents to a Config, layering on top of existing values.
///
/// Every recognised key goes through the same path as a command-line override,
/// so a file and `--config section.key=value` accept exactly the same values.
fn apply_ini_to_config(config: &mut Config, ini: &Ini) -> Result<()> {
    const KEYS: &[(&str, &str)] = &[
        ("cache", "path"),
        ("stores", "of_interest"),
        ("query", "search_limit"),
        ("query", "list_limit"),
        ("query", "call_limit"),
        ("query", "snippet_length"),
        ("decode", "parallel"),
    ];

    for (section, param) in KEYS {
        if let Some(value) = ini.get(section, param) {
            apply_override(config, &format!("{}.{}", section, param), &value)?;
        }
    }

    Ok(())
}

/// Load and parse an INI file.
fn load_ini(path: &Path) -> Result<Ini> {
    let mut ini = Ini::new();
    ini.load(path).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e,
    })?;
    Ok(ini)
}

// =============================================================================
// Override Application
// =============================================================================

/// Apply a single key=value override to the config.
fn apply_override(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.splitn(2, '.').collect();

    match parts.as_slice() {
        ["cache", param] => apply_cache_override(config, param, value),
        ["stores", param] => apply_stores_override(config, param, value),
        ["query", param] => apply_query_override(config, param, value),
        ["decode", param] => apply_decode_override(config, param, value),
        _ => Err(ConfigError::InvalidOverrideKey {
            key: key.to_string(),
            message: "unrecognized key format".to_string(),
        }),
    }
}

fn unknown_parameter(section: &str, param: &str) -> ConfigError {
    ConfigError::InvalidOverrideKey {
        key: format!("{}.{}", section, param),
        message: "unknown parameter".to_string(),
    }
}

fn apply_cache_override(config: &mut Config, param: &str, value: &str) -> Result<()> {
    match param {
        "path" => {
            let value = value.trim();
            config.cache.path = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
            Ok(())
        }
        _ => Err(unknown_parameter("cache", param)),
    }
}

fn apply_stores_override(config: &mut Config, param: &str, value: &str) -> Result<()> {
    match param {
        "of_interest" | "of-interest" => {
            config.stores.of_interest = parse_comma_separated(value);
            Ok(())
        }
        _ => Err(unknown_parameter("stores", param)),
    }
}

fn apply_query_override(config: &mut Config, param: &str, value: &str) -> Result<()> {
    let key = format!("query.{}", param);
    let target = match param {
        "search_limit" => &mut config.query.search_limit,
        "list_limit" => &mut config.query.list_limit,
        "call_limit" => &mut config.query.call_limit,
        "snippet_length" => &mut config.query.snippet_length,
        _ => return Err(unknown_parameter("query", param)),
    };
    *target = parse_usize_value(&key, value)?;
    Ok(())
}

fn apply_decode_override(config: &mut Config, param: &str, value: &str) -> Result<()> {
    match param {
        "parallel" => {
            config.decode.parallel = parse_bool_value("decode.parallel", value)?;
            Ok(())
        }
        _ => Err(unknown_parameter("decode", param)),
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

/// Result of reading configuration, including any warnings.
#[derive(Debug)]
pub struct ConfigResult {
    /// The parsed configuration.
    pub config: Config,
    /// Any warnings generated during config loading.
    pub warnings: Vec<String>,
}

/// Read and parse configuration from the specified sources.
///
/// Configuration is layered in this order:
/// 1. Built-in defaults
/// 2. Base config file (from CLI, env var, or ~/.teamscacheconfig)
/// 3. Override config file (if specified)
/// 4. Individual overrides (applied last)
pub fn read_config(source: &ConfigSource) -> Result<ConfigResult> {
    let mut warnings = Vec::new();

    let mut config = default_config();

    let resolved = resolve_config_file(source)?;
    if let Some(warning) = resolved.warning {
        warnings.push(warning);
    }
    if let Some(ref path) = resolved.path {
        tracing::debug!("reading config file {}", path.display());
        let ini = load_ini(path)?;
        apply_ini_to_config(&mut config, &ini)?;
    }

    if let Some(ref override_path) = source.override_file {
        if !override_path.exists() {
            return Err(ConfigError::FileNotFound(override_path.clone()));
        }
        let ini = load_ini(override_path)?;
        apply_ini_to_config(&mut config, &ini)?;
    }

    for (key, value) in &source.overrides {
        apply_override(&mut config, key, value)?;
    }

    Ok(ConfigResult { config, warnings })
}

// =============================================================================
// Tests
// =============================================================================
