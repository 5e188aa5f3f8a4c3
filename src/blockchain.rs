// Thin re-export module: implementation lives in `blockchain/core.rs`, split
// into the block record, the chain manager and the integrity checks.

pub mod core;
pub use self::core::*;
