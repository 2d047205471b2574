//! In-memory cache storage.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::traits::QueryKey;

/// A single cached read.
#[derive(Debug, Clone)]
pub struct CachedEntry<V> {
  /// The cached value
  pub value: V,
  /// When the value was cached
  pub cached_at: DateTime<Utc>,
}

/// Process-local storage for cached reads.
///
/// Nothing is persisted: a cache lives exactly as long as the session that
/// created it.
#[derive(Debug)]
pub struct MemoryStorage<K, V> {
  entries: HashMap<K, CachedEntry<V>>,
}

impl<K: QueryKey, V: Clone> MemoryStorage<K, V> {
  pub fn new() -> Self {
    Self {
      entries: HashMap::new(),
    }
  }

  /// Get a cached entry by key.
  pub fn get(&self, key: &K) -> Option<&CachedEntry<V>> {
    self.entries.get(key)
  }

  /// Store a value, replacing any previous entry for the key.
  pub fn store(&mut self, key: K, value: V) {
    self.entries.insert(
      key,
      CachedEntry {
        value,
        cached_at: Utc::now(),
      },
    );
  }

  /// Drop every entry of a resource. Returns how many were removed.
  pub fn remove_resource(&mut self, resource: &str) -> usize {
    let before = self.entries.len();
    self.entries.retain(|k, _| k.resource() != resource);
    before - self.entries.len()
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.entries.len()
  }
}

impl<K: QueryKey, V: Clone> Default for MemoryStorage<K, V> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Clone, PartialEq, Eq, Hash)]
  enum Key {
    A(u32),
    B,
  }

  impl QueryKey for Key {
    fn resource(&self) -> &'static str {
      match self {
        Key::A(_) => "a",
        Key::B => "b",
      }
    }

    fn description(&self) -> String {
      format!("{:?}", self)
    }
  }

  #[test]
  fn test_store_and_get() {
    let mut storage = MemoryStorage::new();
    storage.store(Key::A(1), "one");
    assert_eq!(storage.get(&Key::A(1)).map(|e| e.value), Some("one"));
    assert!(storage.get(&Key::A(2)).is_none());
  }

  #[test]
  fn test_remove_resource_only_touches_that_resource() {
    let mut storage = MemoryStorage::new();
    storage.store(Key::A(1), 1);
    storage.store(Key::A(2), 2);
    storage.store(Key::B, 3);

    assert_eq!(storage.remove_resource("a"), 2);
    assert_eq!(storage.len(), 1);
    assert!(storage.get(&Key::B).is_some());
  }
}
