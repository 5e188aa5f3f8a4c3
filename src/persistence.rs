//! Key-value persistence layer for SealChain
//!
//! The chain manager never talks to a database directly. It goes through
//! [`KeyValueStore`], keyed by the decimal block height, with whole
//! serialized blocks as values.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Failure reported by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("read failed: {0}")]
    Read(String),
    #[error("write failed: {0}")]
    Write(String),
}

/// Abstraction for storage backends. A `put` must be atomic: a concurrent
/// reader sees either the previous value or the new one, never a mix.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    fn count(&self) -> Result<u64, StoreError>;
}

/// SQLite-backed store. One row per block height.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Read(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS ledger (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| StoreError::Write(format!("Failed to create ledger table: {}", e)))?;

        tracing::debug!("Opened ledger database at {}", path);
        Ok(Database { conn: Mutex::new(conn) })
    }

    /// Flushes and closes the underlying connection.
    pub fn close(self) -> Result<(), StoreError> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| StoreError::Write("Mutex poisoned".to_string()))?;
        conn.close()
            .map_err(|(_, e)| StoreError::Write(format!("Failed to close database: {}", e)))
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Read("Mutex poisoned".to_string()))?;
        conn.query_row(
            "SELECT value FROM ledger WHERE key = ?1",
            params![key],
            |row| row.get::<_, Vec<u8>>(0),
        )
        .optional()
        .map_err(|e| StoreError::Read(format!("Failed to read key {}: {}", key, e)))?
        .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Write("Mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO ledger (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| StoreError::Write(format!("Failed to write key {}: {}", key, e)))?;
        Ok(())
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Read("Mutex poisoned".to_string()))?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM ledger", [], |row| row.get(0))
            .map_err(|e| StoreError::Read(format!("Failed to count entries: {}", e)))?;
        Ok(count as u64)
    }
}

/// Simple in-memory store useful for tests and ephemeral runs.
///
/// Clones share the same map, so a test can keep one handle while the
/// chain manager owns another.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Read("Mutex poisoned".to_string()))?;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Write("Mutex poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn count(&self) -> Result<u64, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Read("Mutex poisoned".to_string()))?;
        Ok(entries.len() as u64)
    }
}
