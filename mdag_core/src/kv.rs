//! Key-value byte store interface.

use crate::error::{Error, Result};
use crate::hash::Hash;
use std::collections::HashMap;
use std::sync::RwLock;

/// A byte store keyed by content address.
///
/// Values are either raw chunk bytes or encoded objects; the store never interprets
/// them. Implementations must make `put` of an existing key harmless, since two
/// builders may race to write the same node.
pub trait KvStore: Send + Sync {
    /// Check whether a key is present.
    fn has(&self, key: &Hash) -> Result<bool>;

    /// Read the value stored under `key`.
    ///
    /// Returns `Error::ObjectNotFound` if the key is absent.
    fn get(&self, key: &Hash) -> Result<Vec<u8>>;

    /// Store `value` under `key`.
    fn put(&self, key: &Hash, value: &[u8]) -> Result<()>;
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn has(&self, key: &Hash) -> Result<bool> {
        (**self).has(key)
    }

    fn get(&self, key: &Hash) -> Result<Vec<u8>> {
        (**self).get(key)
    }

    fn put(&self, key: &Hash, value: &[u8]) -> Result<()> {
        (**self).put(key, value)
    }
}

/// In-memory, HashMap-based store.
///
/// Intended for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<Hash, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.values.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of all keys.
    pub fn keys(&self) -> Result<Vec<Hash>> {
        let map = self.values.read().map_err(|_| poisoned())?;
        let mut keys: Vec<Hash> = map.keys().copied().collect();
        keys.sort();
        Ok(keys)
    }

    /// Overwrite a value in place, bypassing dedup. Only useful for simulating corruption.
    pub fn replace(&self, key: &Hash, value: Vec<u8>) -> Result<()> {
        let mut map = self.values.write().map_err(|_| poisoned())?;
        map.insert(*key, value);
        Ok(())
    }
}

fn poisoned() -> Error {
    Error::storage("memory store lock poisoned")
}

impl KvStore for MemoryStore {
    fn has(&self, key: &Hash) -> Result<bool> {
        let map = self.values.read().map_err(|_| poisoned())?;
        Ok(map.contains_key(key))
    }

    fn get(&self, key: &Hash) -> Result<Vec<u8>> {
        let map = self.values.read().map_err(|_| poisoned())?;
        map.get(key)
            .cloned()
            .ok_or_else(|| Error::object_not_found(key.to_hex()))
    }

    fn put(&self, key: &Hash, value: &[u8]) -> Result<()> {
        let mut map = self.values.write().map_err(|_| poisoned())?;
        // First writer wins; content addressing makes later values identical.
        map.entry(*key).or_insert_with(|| value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_has() {
        let store = MemoryStore::new();
        let key = Hash::hash_bytes(b"value");

        assert!(!store.has(&key).unwrap());
        store.put(&key, b"value").unwrap();
        assert!(store.has(&key).unwrap());
        assert_eq!(store.get(&key).unwrap(), b"value");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let store = MemoryStore::new();
        let result = store.get(&Hash::hash_bytes(b"nothing"));
        assert!(matches!(result, Err(Error::ObjectNotFound { .. })));
    }

    #[test]
    fn test_put_is_idempotent() {
        let store = MemoryStore::new();
        let key = Hash::hash_bytes(b"v");
        store.put(&key, b"v").unwrap();
        store.put(&key, b"v").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_puts_of_same_key() {
        let store = MemoryStore::new();
        let key = Hash::hash_bytes(b"shared");

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| store.put(&key, b"shared").unwrap());
            }
        });

        assert_eq!(store.keys().unwrap(), vec![key]);
        assert_eq!(store.get(&key).unwrap(), b"shared");
    }

    #[test]
    fn test_store_through_reference() {
        fn put_via<S: KvStore>(store: S, key: &Hash) {
            store.put(key, b"x").unwrap();
        }

        let store = MemoryStore::new();
        let key = Hash::hash_bytes(b"x");
        put_via(&store, &key);
        assert!(store.has(&key).unwrap());
    }
}
