//! The `Block` record stored at each height of the ledger.

use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Payload of the block synthesized for an empty store.
pub const GENESIS_PAYLOAD: &str = "Genesis Block!";

/// A sealed ledger entry.
///
/// Field order is part of the hash input: serde serializes fields in
/// declaration order, so reordering them changes every block hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    /// Hex SHA-256 of the block encoded with this field empty.
    pub hash: String,
    pub height: u64,
    pub payload: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    /// Hash of the block at `height - 1`; empty for genesis.
    pub previous_hash: String,
}

impl Block {
    /// An unsealed block carrying only the caller's payload. Height, time
    /// and both hashes are filled in on append.
    pub fn new(payload: impl Into<String>) -> Self {
        Block {
            hash: String::new(),
            height: 0,
            payload: payload.into(),
            timestamp: 0,
            previous_hash: String::new(),
        }
    }

    pub fn genesis() -> Self {
        Block::new(GENESIS_PAYLOAD)
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    /// Persisted form of the block.
    pub fn encode(&self) -> Result<Vec<u8>, ChainError> {
        serde_json::to_vec(self).map_err(|e| {
            ChainError::Serialization(format!("Failed to encode block {}: {}", self.height, e))
        })
    }

    /// Decodes the bytes stored under `height`.
    pub fn decode(height: u64, bytes: &[u8]) -> Result<Self, ChainError> {
        serde_json::from_slice(bytes).map_err(|e| ChainError::Deserialization {
            height,
            reason: e.to_string(),
        })
    }

    /// Digest of the block with `hash` blanked. The stored `hash` never
    /// contributes to its own input.
    pub fn calculate_hash(&self) -> Result<String, ChainError> {
        let mut unsealed = self.clone();
        unsealed.hash.clear();

        let mut hasher = Sha256::new();
        hasher.update(unsealed.encode()?);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Finalizes `hash`. Must be the last mutation before the block is stored.
    pub fn seal(&mut self) -> Result<(), ChainError> {
        self.hash = self.calculate_hash()?;
        Ok(())
    }
}
