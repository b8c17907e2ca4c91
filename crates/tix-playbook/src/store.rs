//! Key-value store collaborator
//!
//! Provides the [`KvStore`] trait consumed by the playbook client and
//! [`MemoryStore`], a process-local implementation.

use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Key-value store with plain keys and hashes of fields
///
/// Every call is a single blocking round trip. Implementations do not retry.
pub trait KvStore: Send + Sync {
    /// Get a plain key
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Set a plain key
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Delete a plain key or a whole hash; returns whether it existed
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Get a field of a hash
    fn hget(&self, hash: &str, field: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Set a field of a hash, creating the hash if needed
    fn hset(&self, hash: &str, field: &str, value: &[u8]) -> StoreResult<()>;

    /// Delete a field of a hash; returns whether it existed
    fn hdel(&self, hash: &str, field: &str) -> StoreResult<bool>;
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        (**self).delete(key)
    }

    fn hget(&self, hash: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).hget(hash, field)
    }

    fn hset(&self, hash: &str, field: &str, value: &[u8]) -> StoreResult<()> {
        (**self).hset(hash, field, value)
    }

    fn hdel(&self, hash: &str, field: &str) -> StoreResult<bool> {
        (**self).hdel(hash, field)
    }
}

impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        (**self).delete(key)
    }

    fn hget(&self, hash: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        (**self).hget(hash, field)
    }

    fn hset(&self, hash: &str, field: &str, value: &[u8]) -> StoreResult<()> {
        (**self).hset(hash, field, value)
    }

    fn hdel(&self, hash: &str, field: &str) -> StoreResult<bool> {
        (**self).hdel(hash, field)
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Plain(Vec<u8>),
    Hash(HashMap<String, Vec<u8>>),
}

impl Entry {
    fn kind(&self) -> &'static str {
        match self {
            Self::Plain(_) => "plain",
            Self::Hash(_) => "hash",
        }
    }
}

/// In-memory [`KvStore`]
///
/// A key holds either a plain value or a hash; using one as the other is a
/// [`StoreError::WrongType`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create new empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of top-level keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Field names of a hash, sorted
    #[must_use]
    pub fn hkeys(&self, hash: &str) -> Vec<String> {
        let guard = self.entries.read();
        let mut keys: Vec<String> = match guard.get(hash) {
            Some(Entry::Hash(fields)) => fields.keys().cloned().collect(),
            _ => Vec::new(),
        };
        keys.sort();
        keys
    }

    /// Remove every key
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

fn wrong_type(key: &str, expected: &'static str, found: &Entry) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        match self.entries.read().get(key) {
            None => Ok(None),
            Some(Entry::Plain(bytes)) => Ok(Some(bytes.clone())),
            Some(other) => Err(wrong_type(key, "plain", other)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), Entry::Plain(value.to_vec()));
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn hget(&self, hash: &str, field: &str) -> StoreResult<Option<Vec<u8>>> {
        match self.entries.read().get(hash) {
            None => Ok(None),
            Some(Entry::Hash(fields)) => Ok(fields.get(field).cloned()),
            Some(other) => Err(wrong_type(hash, "hash", other)),
        }
    }

    fn hset(&self, hash: &str, field: &str, value: &[u8]) -> StoreResult<()> {
        let mut guard = self.entries.write();
        let entry = guard
            .entry(hash.to_string())
            .or_insert_with(|| Entry::Hash(HashMap::new()));
        match entry {
            Entry::Hash(fields) => {
                fields.insert(field.to_string(), value.to_vec());
                Ok(())
            }
            other => Err(wrong_type(hash, "hash", other)),
        }
    }

    fn hdel(&self, hash: &str, field: &str) -> StoreResult<bool> {
        let mut guard = self.entries.write();
        match guard.get_mut(hash) {
            None => Ok(false),
            Some(Entry::Hash(fields)) => Ok(fields.remove(field).is_some()),
            Some(other) => Err(wrong_type(hash, "hash", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_set_get_delete() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.set("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
        assert!(store.delete("k").unwrap());
        assert!(!store.delete("k").unwrap());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn hash_fields_are_independent() {
        let store = MemoryStore::new();
        store.hset("ctx-1", "a", b"1").unwrap();
        store.hset("ctx-2", "a", b"2").unwrap();
        assert_eq!(store.hget("ctx-1", "a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.hget("ctx-2", "a").unwrap(), Some(b"2".to_vec()));
        assert_eq!(store.hget("ctx-3", "a").unwrap(), None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn hdel_and_hkeys() {
        let store = MemoryStore::new();
        store.hset("ctx", "b", b"2").unwrap();
        store.hset("ctx", "a", b"1").unwrap();
        assert_eq!(store.hkeys("ctx"), vec!["a".to_string(), "b".to_string()]);
        assert!(store.hdel("ctx", "a").unwrap());
        assert!(!store.hdel("ctx", "a").unwrap());
        assert_eq!(store.hkeys("ctx"), vec!["b".to_string()]);
    }

    #[test]
    fn wrong_entry_kind_is_an_error() {
        let store = MemoryStore::new();
        store.set("plain", b"x").unwrap();
        let err = store.hget("plain", "f").unwrap_err();
        assert!(matches!(err, StoreError::WrongType { expected: "hash", found: "plain", .. }));
        store.hset("hash", "f", b"x").unwrap();
        assert!(store.get("hash").is_err());
    }

    #[test]
    fn shared_through_arc_and_ref() {
        let store = Arc::new(MemoryStore::new());
        let by_arc: &dyn KvStore = &store;
        by_arc.hset("ctx", "f", b"v").unwrap();
        let by_ref = &*store;
        assert_eq!(KvStore::hget(&by_ref, "ctx", "f").unwrap(), Some(b"v".to_vec()));
    }
}
