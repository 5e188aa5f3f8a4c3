//! Caching layer for recently decoded blocks
//!
//! Entries are keyed by the height they were read from and remember the raw
//! stored bytes. A cached block is only handed out when the store still
//! holds exactly those bytes, so the cache saves decoding work but never
//! answers on the store's behalf. Integrity checks bypass it entirely.
use crate::blockchain::Block;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

struct CachedBlock {
    raw: Vec<u8>,
    block: Block,
}

pub struct BlockCache {
    blocks: Mutex<LruCache<u64, CachedBlock>>,
}

impl BlockCache {
    /// Returns `None` for a zero capacity, which disables caching.
    pub fn new(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(|cap| BlockCache {
            blocks: Mutex::new(LruCache::new(cap)),
        })
    }

    /// The block decoded from `raw` at `height`, if it was cached from
    /// identical bytes.
    pub fn get(&self, height: u64, raw: &[u8]) -> Option<Block> {
        let mut blocks = self.blocks.lock();
        match blocks.get(&height) {
            Some(entry) if entry.raw == raw => Some(entry.block.clone()),
            Some(_) => {
                blocks.pop(&height);
                None
            }
            None => None,
        }
    }

    /// Caches `block` decoded from `raw` under `height`. Blocks claiming a
    /// different height than the key they were read from are not cached.
    pub fn put(&self, height: u64, raw: Vec<u8>, block: Block) {
        if block.height != height {
            return;
        }
        self.blocks.lock().put(height, CachedBlock { raw, block });
    }

    /// Drops the entry for `height`, if any.
    pub fn invalidate(&self, height: u64) {
        self.blocks.lock().pop(&height);
    }

    pub fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
