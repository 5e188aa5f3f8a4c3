//! Shared plumbing for the command-line binaries.

use crate::blockchain::ChainManager;
use crate::config::{load_config, Backend, Config, LoggingConfig};
use crate::error::ChainError;
use crate::persistence::{Database, InMemoryStore, KeyValueStore};
use std::path::Path;

/// Installs the fmt subscriber at the configured level.
pub fn init_logging(logging: &LoggingConfig) -> Result<(), ChainError> {
    let level = logging.level_filter()?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| ChainError::Config(format!("Failed to install logger: {}", e)))
}

/// Opens the configured store and ensures the genesis block exists.
pub fn open_chain_from_config(config: &Config) -> Result<ChainManager, ChainError> {
    let store: Box<dyn KeyValueStore> = match config.database.backend {
        Backend::Memory => Box::new(InMemoryStore::new()),
        Backend::Sqlite => {
            if let Some(parent) = Path::new(&config.database.path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let db = Database::open(&config.database.path)
                .map_err(|e| ChainError::StorageRead(e.to_string()))?;
            Box::new(db)
        }
    };

    let chain = ChainManager::open_with_genesis(store, &config.chain.genesis_payload)?;
    Ok(chain.with_cache(config.chain.cache_capacity))
}

/// Rejects backends that do not outlive the process. Each binary is a
/// separate run, so a memory store would start empty every time.
pub fn require_persistent_backend(config: &Config) -> Result<(), ChainError> {
    match config.database.backend {
        Backend::Sqlite => Ok(()),
        Backend::Memory => Err(ChainError::Config(
            "database.backend = \"memory\" is not persisted between commands; use \"sqlite\""
                .to_string(),
        )),
    }
}

/// Loads the config, sets up logging and opens the chain.
pub fn load_chain_from_config() -> Result<(Config, ChainManager), ChainError> {
    let config = load_config()?;
    require_persistent_backend(&config)?;
    init_logging(&config.logging)?;
    let chain = open_chain_from_config(&config)?;
    Ok((config, chain))
}
