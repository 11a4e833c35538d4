//! Configuration helper for interpreting config values.
//!
//! The `ConfigHelper` wraps a `Config` and turns it into the settings the cache
//! facade and query engine consume.

use std::path::Path;

use crate::cache::BuildSettings;

use super::{Config, QueryConfig};

/// Helper for interpreting configuration values.
#[derive(Debug, Clone)]
pub struct ConfigHelper {
    config: Config,
}

impl ConfigHelper {
    /// Create a new ConfigHelper wrapping the given config.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Explicitly configured store directory, if any.
    pub fn cache_path(&self) -> Option<&Path> {
        self.config.cache.path.as_deref()
    }

    /// Settings for the one-time build pass.
    pub fn build_settings(&self) -> BuildSettings {
        BuildSettings {
            stores_of_interest: self.config.stores.of_interest.clone(),
            parallel: self.config.decode.parallel,
        }
    }

    pub fn query(&self) -> &QueryConfig {
        &self.config.query
    }
}

impl From<Config> for ConfigHelper {
    fn from(config: Config) -> Self {
        Self::new(config)
    }
}
