use crate::blockchain::core::block::Block;
use crate::error::ChainError;

/// A single integrity problem found while auditing the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finding {
    /// Stored hash does not match the recomputed one, or the block claims
    /// a different height than the key it is stored under.
    HashMismatch(u64),
    /// `hash` of this height differs from `previous_hash` of the next one.
    BrokenLink(u64),
    /// Stored bytes at this height do not decode into a block.
    Unreadable(u64),
}

impl Finding {
    pub fn height(&self) -> u64 {
        match self {
            Finding::HashMismatch(h) | Finding::BrokenLink(h) | Finding::Unreadable(h) => *h,
        }
    }
}

/// Result of a full-chain audit, in the order the checks ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainAudit {
    /// Tip height at the time of the audit; `None` for an empty chain.
    pub tip: Option<u64>,
    pub findings: Vec<Finding>,
}

impl ChainAudit {
    pub fn is_valid(&self) -> bool {
        self.findings.is_empty()
    }

    /// Offending heights, ascending, each listed once.
    pub fn error_heights(&self) -> Vec<u64> {
        let mut heights: Vec<u64> = self.findings.iter().map(Finding::height).collect();
        heights.sort_unstable();
        heights.dedup();
        heights
    }
}

/// Recomputes the hash of `block` and checks it was read from `height`.
pub fn verify_block(block: &Block, height: u64) -> Result<bool, ChainError> {
    if block.height != height {
        return Ok(false);
    }
    Ok(block.calculate_hash()? == block.hash)
}

pub fn verify_link(previous: &Block, next: &Block) -> bool {
    previous.hash == next.previous_hash
}
