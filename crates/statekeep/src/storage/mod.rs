//! Key-value storage backends.
//!
//! The middleware only needs three operations: read a string under a key,
//! write one, and remove one. Any of them may fail; callers contain the
//! failure instead of propagating it into the host's transition pipeline.

mod memory;
mod redb_store;

use std::sync::Arc;

use crate::error::StorageResult;

pub use self::memory::MemoryStorage;
pub use self::redb_store::RedbStorage;

/// Capability contract for a string key-value store.
///
/// All methods take `&self`; implementations use interior mutability and must
/// complete one write for a key before another write for that key begins.
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`. `Ok(None)` when absent.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Insert or replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}
