//! SealChain - an append-only, hash-linked ledger keyed by block height
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Block record, chain manager and integrity checks
//!
//! ## Storage
//! - [`persistence`] - Key-value store trait with SQLite and in-memory backends
//! - [`cache`] - LRU cache for block reads
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - CLI utilities

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;

// ============================================================================
// Storage
// ============================================================================
pub mod cache;
pub mod persistence;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod cli;
pub mod config;
pub mod error;
