//! Configuration management for SealChain

use crate::blockchain::GENESIS_PAYLOAD;
use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::level_filters::LevelFilter;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "sealchain.toml";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_ENV_VAR: &str = "SEALCHAIN_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage backend. `Memory` lives only as long as the process, so the
/// command-line binaries refuse it; it is meant for embedding and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_backend")]
    pub backend: Backend,
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_genesis_payload")]
    pub genesis_payload: String,
    /// Blocks kept in the read cache; 0 disables it.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            genesis_payload: default_genesis_payload(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, ChainError> {
        self.level
            .parse::<LevelFilter>()
            .map_err(|_| ChainError::Config(format!("unknown logging.level '{}'", self.level)))
    }
}

fn default_backend() -> Backend {
    Backend::Sqlite
}

fn default_db_path() -> String {
    "./data/sealchain.db".to_string()
}

fn default_genesis_payload() -> String {
    GENESIS_PAYLOAD.to_string()
}

fn default_cache_capacity() -> usize {
    128
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Loads the config from `$SEALCHAIN_CONFIG`, or `sealchain.toml` when the
/// variable is unset. A missing file yields the defaults.
pub fn load_config() -> Result<Config, ChainError> {
    let path = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config_from(&path)
}

pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let config_str = match fs::read_to_string(path.as_ref()) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    parse_config(&config_str)
}

pub fn parse_config(config_str: &str) -> Result<Config, ChainError> {
    let config: Config = toml::from_str(config_str)?;

    // Validate critical values
    if config.database.backend == Backend::Sqlite && config.database.path.is_empty() {
        return Err(ChainError::Config(
            "database.path must be set when database.backend = \"sqlite\"".to_string(),
        ));
    }
    config.logging.level_filter()?;

    Ok(config)
}
