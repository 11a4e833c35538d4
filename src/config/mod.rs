//! Configuration module.

mod config_helper;
mod read_config;
mod types;

pub use config_helper::ConfigHelper;
pub use read_config::{read_config, ConfigError, ConfigResult, ConfigSource};
pub(crate) use read_config::{default_config, home_dir};
pub use types::{CacheConfig, Config, DecodeConfig, QueryConfig, StoresConfig};

impl Default for Config {
    fn default() -> Self {
        default_config()
    }
}
