//! Persistent storage backed by redb.
//!
//! Every key lives in a single `entries` table with `&str` keys and `&str`
//! values. Each write runs in its own committed transaction; redb admits one
//! write transaction at a time, so concurrent writers to the same key never
//! interleave.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, TableDefinition};
use tracing::debug;

use crate::error::{StorageError, StorageResult};

use super::StorageBackend;

/// Persisted state slices keyed by storage path.
const ENTRIES: TableDefinition<&str, &str> = TableDefinition::new("entries");

/// Convert any `Display` error into a `StorageError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StorageError::$variant(e.to_string())
    };
}

/// Thread-safe storage backed by a redb database file.
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let storage = Self { db: Arc::new(db) };
        storage.ensure_table()?;
        debug!(?path, "redb storage opened");
        Ok(storage)
    }

    /// Create an ephemeral in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let storage = Self { db: Arc::new(db) };
        storage.ensure_table()?;
        debug!("in-memory redb storage opened");
        Ok(storage)
    }

    fn ensure_table(&self) -> StorageResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(ENTRIES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

impl StorageBackend for RedbStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(ENTRIES).map_err(map_err!(Table))?;
        let value = table
            .get(key)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(ENTRIES).map_err(map_err!(Table))?;
            table.insert(key, value).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, bytes = value.len(), "entry stored");
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(ENTRIES).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, existed, "entry removed");
        Ok(())
    }
}
