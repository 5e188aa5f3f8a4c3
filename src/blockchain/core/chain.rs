use crate::blockchain::core::block::Block;
use crate::blockchain::core::validation::{verify_block, verify_link, ChainAudit, Finding};
use crate::cache::BlockCache;
use crate::error::ChainError;
use crate::persistence::{InMemoryStore, KeyValueStore, StoreError};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

/// Lifecycle of a chain, derived from what is in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Store holds no blocks.
    Uninitialized,
    /// Only the genesis block exists.
    Initialized,
    /// At least one block past genesis.
    Growing,
}

/// Storage key for a block height.
pub fn height_key(height: u64) -> String {
    height.to_string()
}

fn read_error(height: u64, err: StoreError) -> ChainError {
    match err {
        StoreError::NotFound(_) => ChainError::NotFound(height),
        StoreError::Read(msg) | StoreError::Write(msg) => ChainError::StorageRead(msg),
    }
}

fn write_error(err: StoreError) -> ChainError {
    match err {
        StoreError::NotFound(key) => ChainError::StorageWrite(format!("key vanished: {}", key)),
        StoreError::Read(msg) | StoreError::Write(msg) => ChainError::StorageWrite(msg),
    }
}

/// Appends, reads and verifies blocks held in a [`KeyValueStore`].
///
/// Appends are serialized through an internal writer lock, so one manager
/// can be shared across threads. Two managers over the same store are not
/// coordinated; callers must keep a single writer per store.
pub struct ChainManager {
    store: Box<dyn KeyValueStore>,
    gate: RwLock<()>,
    cache: Option<BlockCache>,
}

impl ChainManager {
    /// Wraps `store` without touching it. Call [`ChainManager::initialize`]
    /// before appending if the store may be empty.
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        ChainManager {
            store,
            gate: RwLock::new(()),
            cache: None,
        }
    }

    /// Wraps `store` and ensures the genesis block exists.
    pub fn open(store: Box<dyn KeyValueStore>) -> Result<Self, ChainError> {
        let chain = Self::new(store);
        chain.initialize()?;
        Ok(chain)
    }

    /// Like [`ChainManager::open`], with a custom genesis payload.
    pub fn open_with_genesis(
        store: Box<dyn KeyValueStore>,
        genesis_payload: &str,
    ) -> Result<Self, ChainError> {
        let chain = Self::new(store);
        chain.initialize_with(Block::new(genesis_payload))?;
        Ok(chain)
    }

    /// A manager over a fresh in-memory store, with genesis already appended.
    pub fn in_memory() -> Result<Self, ChainError> {
        Self::open(Box::new(InMemoryStore::new()))
    }

    /// Enables an LRU cache of `capacity` blocks for [`ChainManager::get_block`].
    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = BlockCache::new(capacity);
        self
    }

    /// Appends the genesis block if the store is empty. Returns the new
    /// genesis block, or `None` when the chain already had one.
    pub fn initialize(&self) -> Result<Option<Block>, ChainError> {
        self.initialize_with(Block::genesis())
    }

    fn initialize_with(&self, genesis: Block) -> Result<Option<Block>, ChainError> {
        let _guard = self.gate.write();
        if let Some(height) = self.height()? {
            debug!("Chain already initialized at height {}", height);
            return Ok(None);
        }
        let genesis = self.append(genesis)?;
        info!("Created genesis block {}", genesis.hash);
        Ok(Some(genesis))
    }

    /// Height of the most recent block, or `None` when the store is empty.
    pub fn height(&self) -> Result<Option<u64>, ChainError> {
        let count = self
            .store
            .count()
            .map_err(|e| ChainError::StorageRead(e.to_string()))?;
        Ok(count.checked_sub(1))
    }

    /// [`ChainManager::height`] with `-1` standing in for an empty chain.
    pub fn height_or_sentinel(&self) -> Result<i64, ChainError> {
        Ok(self.height()?.map_or(-1, |h| h as i64))
    }

    pub fn state(&self) -> Result<ChainState, ChainError> {
        Ok(match self.height()? {
            None => ChainState::Uninitialized,
            Some(0) => ChainState::Initialized,
            Some(_) => ChainState::Growing,
        })
    }

    /// Seals `payload` into a new block on top of the current tip and
    /// persists it.
    pub fn add_block(&self, payload: impl Into<String>) -> Result<Block, ChainError> {
        let _guard = self.gate.write();
        self.append(Block::new(payload))
    }

    /// Caller must hold the write gate.
    fn append(&self, mut block: Block) -> Result<Block, ChainError> {
        let height = self.height()?.map_or(0, |tip| tip + 1);
        block.height = height;
        block.timestamp = chrono::Utc::now().timestamp().max(0) as u64;
        block.previous_hash = if height == 0 {
            String::new()
        } else {
            let previous = self.read_block(height - 1).map_err(|e| match e {
                ChainError::NotFound(h) => ChainError::PreviousBlockMissing(h),
                other => other,
            })?;
            previous.hash
        };
        block.seal()?;

        let bytes = block.encode()?;
        self.store
            .put(&height_key(height), &bytes)
            .map_err(write_error)?;

        info!("Appended block {} at height {}", block.hash, height);
        Ok(block)
    }

    /// Reads the block stored at `height`. The store is always consulted;
    /// the cache only skips decoding bytes it has already seen.
    pub fn get_block(&self, height: u64) -> Result<Block, ChainError> {
        let bytes = self.read_raw(height)?;
        let cache = match &self.cache {
            Some(cache) => cache,
            None => return Block::decode(height, &bytes),
        };
        if let Some(block) = cache.get(height, &bytes) {
            return Ok(block);
        }
        let block = Block::decode(height, &bytes)?;
        cache.put(height, bytes, block.clone());
        Ok(block)
    }

    fn read_raw(&self, height: u64) -> Result<Vec<u8>, ChainError> {
        debug!("Reading block at height {}", height);
        self.store
            .get(&height_key(height))
            .map_err(|e| read_error(height, e))
    }

    /// Reads straight from the store, bypassing the cache.
    fn read_block(&self, height: u64) -> Result<Block, ChainError> {
        let bytes = self.read_raw(height)?;
        Block::decode(height, &bytes)
    }

    /// All blocks from genesis to the tip, in height order.
    pub fn blocks(&self) -> Result<Vec<Block>, ChainError> {
        let _guard = self.gate.read();
        match self.height()? {
            None => Ok(Vec::new()),
            Some(tip) => (0..=tip).map(|h| self.get_block(h)).collect(),
        }
    }

    /// Recomputes the hash of the stored block at `height` and compares it
    /// with the stored one.
    pub fn validate_block(&self, height: u64) -> Result<bool, ChainError> {
        let block = self.read_block(height)?;
        verify_block(&block, height)
    }

    /// Heights that fail the block or link check, ascending and deduplicated.
    /// Empty means the chain is intact.
    pub fn validate_chain(&self) -> Result<Vec<u64>, ChainError> {
        Ok(self.audit_chain()?.error_heights())
    }

    /// Checks every block's hash and every consecutive link up to the
    /// current tip.
    ///
    /// Undecodable blocks are reported as [`Finding::Unreadable`]; missing
    /// keys and storage failures abort the audit.
    pub fn audit_chain(&self) -> Result<ChainAudit, ChainError> {
        let _guard = self.gate.read();
        let tip = match self.height()? {
            Some(tip) => tip,
            None => return Ok(ChainAudit::default()),
        };

        let mut findings = Vec::new();
        let mut previous: Option<Block> = None;

        for height in 0..=tip {
            let current = match self.read_block(height) {
                Ok(block) => Some(block),
                Err(ChainError::Deserialization { reason, .. }) => {
                    warn!("Block at height {} is unreadable: {}", height, reason);
                    findings.push(Finding::Unreadable(height));
                    None
                }
                Err(e) => return Err(e),
            };

            if let (Some(prev), Some(block)) = (&previous, &current) {
                if !verify_link(prev, block) {
                    warn!("Broken link between heights {} and {}", height - 1, height);
                    findings.push(Finding::BrokenLink(height - 1));
                }
            }

            if let Some(block) = &current {
                if !verify_block(block, height)? {
                    warn!("Hash mismatch at height {}", height);
                    findings.push(Finding::HashMismatch(height));
                }
            }

            previous = current;
        }

        Ok(ChainAudit {
            tip: Some(tip),
            findings,
        })
    }

    /// Overwrites the block at `height` without resealing or relinking.
    /// Exists only to exercise tamper detection.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn tamper_block(&self, height: u64, block: &Block) -> Result<(), ChainError> {
        let bytes = block.encode()?;
        self.tamper_raw(height, &bytes)
    }

    /// Overwrites the raw bytes stored at `height`.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn tamper_raw(&self, height: u64, bytes: &[u8]) -> Result<(), ChainError> {
        let _guard = self.gate.write();
        self.store
            .put(&height_key(height), bytes)
            .map_err(write_error)?;
        if let Some(cache) = &self.cache {
            cache.invalidate(height);
        }
        warn!("Block at height {} overwritten outside of append", height);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::core::block::GENESIS_PAYLOAD;
    use std::sync::Arc;

    struct FailingStore {
        fail_reads: bool,
    }

    impl KeyValueStore for FailingStore {
        fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::NotFound(key.to_string()))
        }

        fn put(&self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Write("disk full".to_string()))
        }

        fn count(&self) -> Result<u64, StoreError> {
            if self.fail_reads {
                Err(StoreError::Read("io failure".to_string()))
            } else {
                Ok(0)
            }
        }
    }

    fn chain_with(payloads: &[&str]) -> ChainManager {
        let chain = ChainManager::in_memory().unwrap();
        for payload in payloads {
            chain.add_block(*payload).unwrap();
        }
        chain
    }

    #[test]
    fn test_new_manager_is_uninitialized() {
        let chain = ChainManager::new(Box::new(InMemoryStore::new()));
        assert_eq!(chain.height().unwrap(), None);
        assert_eq!(chain.height_or_sentinel().unwrap(), -1);
        assert_eq!(chain.state().unwrap(), ChainState::Uninitialized);
    }

    #[test]
    fn test_genesis_invariant() {
        let chain = ChainManager::in_memory().unwrap();
        assert_eq!(chain.height().unwrap(), Some(0));
        assert_eq!(chain.state().unwrap(), ChainState::Initialized);

        let genesis = chain.get_block(0).unwrap();
        assert_eq!(genesis.payload, GENESIS_PAYLOAD);
        assert!(genesis.previous_hash.is_empty());
        assert!(chain.validate_block(0).unwrap());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let chain = ChainManager::in_memory().unwrap();
        let genesis = chain.get_block(0).unwrap();

        assert!(chain.initialize().unwrap().is_none());
        assert_eq!(chain.height().unwrap(), Some(0));
        assert_eq!(chain.get_block(0).unwrap(), genesis);
    }

    #[test]
    fn test_custom_genesis_payload() {
        let chain =
            ChainManager::open_with_genesis(Box::new(InMemoryStore::new()), "hello").unwrap();
        assert_eq!(chain.get_block(0).unwrap().payload, "hello");
    }

    #[test]
    fn test_add_block_links_to_previous() {
        let chain = chain_with(&["A"]);
        let genesis = chain.get_block(0).unwrap();
        let block = chain.get_block(1).unwrap();

        assert_eq!(block.height, 1);
        assert_eq!(block.payload, "A");
        assert_eq!(block.previous_hash, genesis.hash);
        assert_eq!(block.hash, block.calculate_hash().unwrap());
        assert_eq!(chain.state().unwrap(), ChainState::Growing);
    }

    #[test]
    fn test_add_block_on_empty_store_starts_at_zero() {
        let chain = ChainManager::new(Box::new(InMemoryStore::new()));
        let block = chain.add_block("first").unwrap();
        assert_eq!(block.height, 0);
        assert!(block.previous_hash.is_empty());
        assert!(chain.initialize().unwrap().is_none());
    }

    #[test]
    fn test_add_block_returns_stored_block() {
        let chain = ChainManager::in_memory().unwrap();
        let appended = chain.add_block("A").unwrap();
        assert_eq!(chain.get_block(1).unwrap(), appended);
    }

    #[test]
    fn test_timestamp_is_in_seconds() {
        let chain = chain_with(&["A"]);
        let now = chrono::Utc::now().timestamp() as u64;
        let block = chain.get_block(1).unwrap();
        assert!(block.timestamp <= now);
        assert!(now - block.timestamp < 60);
    }

    #[test]
    fn test_append_monotonicity() {
        let chain = ChainManager::in_memory().unwrap();
        for n in 1..=10u64 {
            chain.add_block(format!("block {}", n)).unwrap();
            assert_eq!(chain.height().unwrap(), Some(n));
        }
        assert_eq!(chain.blocks().unwrap().len(), 11);
    }

    #[test]
    fn test_get_block_missing() {
        let chain = ChainManager::in_memory().unwrap();
        assert_eq!(chain.get_block(9), Err(ChainError::NotFound(9)));
    }

    #[test]
    fn test_get_block_malformed() {
        let chain = ChainManager::in_memory().unwrap();
        chain.tamper_raw(0, b"{broken").unwrap();
        assert!(matches!(
            chain.get_block(0),
            Err(ChainError::Deserialization { height: 0, .. })
        ));
    }

    #[test]
    fn test_missing_predecessor_is_reported() {
        let store = InMemoryStore::new();
        // Count says one block exists, but under the wrong key.
        store.put("7", b"orphan").unwrap();
        let chain = ChainManager::new(Box::new(store));
        assert_eq!(
            chain.add_block("A"),
            Err(ChainError::PreviousBlockMissing(0))
        );
    }

    #[test]
    fn test_write_failure_is_reported() {
        let chain = ChainManager::new(Box::new(FailingStore { fail_reads: false }));
        assert_eq!(
            chain.add_block("A"),
            Err(ChainError::StorageWrite("disk full".to_string()))
        );
    }

    #[test]
    fn test_read_failure_is_not_empty_chain() {
        let chain = ChainManager::new(Box::new(FailingStore { fail_reads: true }));
        assert!(matches!(chain.height(), Err(ChainError::StorageRead(_))));
        assert!(matches!(chain.validate_chain(), Err(ChainError::StorageRead(_))));
    }

    #[test]
    fn test_validate_chain_empty_store() {
        let chain = ChainManager::new(Box::new(InMemoryStore::new()));
        assert!(chain.validate_chain().unwrap().is_empty());
    }

    #[test]
    fn test_validate_chain_intact() {
        let chain = chain_with(&["A", "B", "C"]);
        assert_eq!(chain.height().unwrap(), Some(3));
        assert!(chain.validate_chain().unwrap().is_empty());
        assert!(chain.audit_chain().unwrap().is_valid());
    }

    #[test]
    fn test_tamper_with_stale_hash() {
        let chain = chain_with(&["A", "B", "C"]);
        let mut block = chain.get_block(2).unwrap();
        block.payload = "B'".to_string();
        chain.tamper_block(2, &block).unwrap();

        assert!(!chain.validate_block(2).unwrap());
        let audit = chain.audit_chain().unwrap();
        assert_eq!(audit.findings, vec![Finding::HashMismatch(2)]);
        assert_eq!(chain.validate_chain().unwrap(), vec![2]);
    }

    #[test]
    fn test_tamper_with_resealed_hash_breaks_link() {
        let chain = chain_with(&["A", "B", "C"]);
        let mut block = chain.get_block(2).unwrap();
        block.payload = "B'".to_string();
        block.seal().unwrap();
        chain.tamper_block(2, &block).unwrap();

        assert!(chain.validate_block(2).unwrap());
        let audit = chain.audit_chain().unwrap();
        assert_eq!(audit.findings, vec![Finding::BrokenLink(2)]);
    }

    #[test]
    fn test_tampered_tip_is_detected() {
        let chain = chain_with(&["A", "B"]);
        let mut tip = chain.get_block(2).unwrap();
        tip.timestamp += 1;
        chain.tamper_block(2, &tip).unwrap();
        assert_eq!(chain.validate_chain().unwrap(), vec![2]);
    }

    #[test]
    fn test_tamper_each_field() {
        let mutations: [fn(&mut Block); 5] = [
            |b| b.payload.push('x'),
            |b| b.timestamp += 1,
            |b| b.previous_hash = "00".repeat(32),
            |b| b.hash = "11".repeat(32),
            |b| b.height += 1,
        ];
        for mutate in mutations {
            let chain = chain_with(&["A", "B"]);
            let mut block = chain.get_block(1).unwrap();
            mutate(&mut block);
            chain.tamper_block(1, &block).unwrap();
            assert!(!chain.validate_block(1).unwrap());
        }
    }

    #[test]
    fn test_unreadable_block_is_a_finding() {
        let chain = chain_with(&["A", "B"]);
        chain.tamper_raw(1, b"garbage").unwrap();
        let audit = chain.audit_chain().unwrap();
        assert_eq!(audit.findings, vec![Finding::Unreadable(1)]);
        assert!(chain.validate_block(1).is_err());
    }

    #[test]
    fn test_tamper_invalidates_cache() {
        let chain = chain_with(&["A"]).with_cache(8);
        let mut block = chain.get_block(1).unwrap();
        block.payload = "changed".to_string();
        chain.tamper_block(1, &block).unwrap();
        assert_eq!(chain.get_block(1).unwrap().payload, "changed");
    }

    #[test]
    fn test_concurrent_appends_are_serialized() {
        let chain = Arc::new(ChainManager::in_memory().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let chain = Arc::clone(&chain);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        chain.add_block(format!("thread {} block {}", t, i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(chain.height().unwrap(), Some(80));
        assert!(chain.validate_chain().unwrap().is_empty());
    }
}
