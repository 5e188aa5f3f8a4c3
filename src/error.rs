//! Error types for SealChain

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    NotFound(u64),
    StorageRead(String),
    StorageWrite(String),
    Serialization(String),
    Deserialization { height: u64, reason: String },
    PreviousBlockMissing(u64),
    Config(String),
    Io(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChainError::NotFound(height) => write!(f, "No block stored at height {}", height),
            ChainError::StorageRead(msg) => write!(f, "Storage read error: {}", msg),
            ChainError::StorageWrite(msg) => write!(f, "Storage write error: {}", msg),
            ChainError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ChainError::Deserialization { height, reason } => {
                write!(f, "Block at height {} is malformed: {}", height, reason)
            }
            ChainError::PreviousBlockMissing(height) => write!(
                f,
                "Previous block missing at height {} (storage is corrupted)",
                height
            ),
            ChainError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ChainError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
