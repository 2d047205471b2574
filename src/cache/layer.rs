//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::debug;

use super::storage::MemoryStorage;
use super::traits::{CacheResult, QueryKey};

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, String>>>;

/// A network fetch other callers can join
struct InFlight<V> {
  fetch: SharedFetch<V>,
  epoch: u64,
}

struct Inner<K, V> {
  storage: MemoryStorage<K, V>,
  in_flight: HashMap<K, InFlight<V>>,
}

/// Cache layer that manages caching logic and network fetching.
///
/// Reads are keyed; a fresh entry is served without touching the network,
/// concurrent reads of one key share a single request, and a stale entry is
/// refetched on next access. Errors are handed back to the caller and never
/// stored.
///
/// Invalidation bumps an epoch that live queries watch, so every observer of
/// the invalidated resource refetches.
pub struct CacheLayer<K, V> {
  inner: Arc<Mutex<Inner<K, V>>>,
  epoch: Arc<watch::Sender<u64>>,
  /// How long before cached data is considered stale
  stale_time: Duration,
}

impl<K: QueryKey, V: Clone + Send + Sync + 'static> CacheLayer<K, V> {
  /// Create a new cache layer with the default five minute stale time.
  pub fn new() -> Self {
    let (epoch, _) = watch::channel(0);
    Self {
      inner: Arc::new(Mutex::new(Inner {
        storage: MemoryStorage::new(),
        in_flight: HashMap::new(),
      })),
      epoch: Arc::new(epoch),
      stale_time: Duration::minutes(5),
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Check if cached data is stale based on cached_at timestamp.
  fn is_stale(&self, cached_at: chrono::DateTime<Utc>) -> bool {
    Utc::now() - cached_at >= self.stale_time
  }

  fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
    // A panic while holding the lock leaves only plain maps behind
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Current invalidation epoch
  pub fn epoch(&self) -> u64 {
    *self.epoch.borrow()
  }

  /// Watch for invalidations
  pub fn subscribe(&self) -> watch::Receiver<u64> {
    self.epoch.subscribe()
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Fresh cached entry - return immediately
  /// 2. Request for this key already in flight - join it
  /// 3. Otherwise fetch from network
  /// 4. Store the result unless the resource was invalidated meanwhile
  pub async fn fetch<F, Fut, E>(&self, key: &K, fetcher: F) -> Result<CacheResult<V>, String>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    E: Display,
  {
    let (fetch, started_epoch) = {
      let mut inner = self.lock();

      if let Some(cached) = inner.storage.get(key) {
        if !self.is_stale(cached.cached_at) {
          return Ok(CacheResult::from_cache(
            cached.value.clone(),
            cached.cached_at,
          ));
        }
      }

      match inner.in_flight.get(key) {
        Some(pending) => {
          debug!(key = %key.description(), "joining in-flight request");
          (pending.fetch.clone(), pending.epoch)
        }
        None => {
          debug!(key = %key.description(), "fetching from network");
          let epoch = self.epoch();
          let fetch = fetcher()
            .map(|r| r.map_err(|e| e.to_string()))
            .boxed()
            .shared();
          inner.in_flight.insert(
            key.clone(),
            InFlight {
              fetch: fetch.clone(),
              epoch,
            },
          );
          (fetch, epoch)
        }
      }
    };

    let result = fetch.clone().await;

    let mut inner = self.lock();
    let same_request = inner
      .in_flight
      .get(key)
      .is_some_and(|pending| pending.fetch.ptr_eq(&fetch));
    if same_request {
      inner.in_flight.remove(key);
    }

    let data = result?;
    if started_epoch == self.epoch() {
      inner.storage.store(key.clone(), data.clone());
    }
    Ok(CacheResult::from_network(data))
  }

  /// Drop every cached read of a resource and notify watchers.
  ///
  /// Requests already in flight are detached: their callers still get the
  /// response, but it is not stored and new reads start a fresh request.
  pub fn invalidate_resource(&self, resource: &str) {
    let removed = {
      let mut inner = self.lock();
      inner.in_flight.retain(|k, _| k.resource() != resource);
      inner.storage.remove_resource(resource)
    };
    self.epoch.send_modify(|epoch| *epoch += 1);
    debug!(resource, removed, "invalidated cache");
  }

  /// Number of cached entries
  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.lock().storage.len()
  }
}

impl<K: QueryKey, V: Clone + Send + Sync + 'static> Default for CacheLayer<K, V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V> Clone for CacheLayer<K, V> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
      epoch: Arc::clone(&self.epoch),
      stale_time: self.stale_time,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::traits::CacheSource;
  use std::sync::atomic::{AtomicU32, Ordering};

  #[derive(Debug, Clone, PartialEq, Eq, Hash)]
  enum Key {
    Page(u32),
    Other,
  }

  impl QueryKey for Key {
    fn resource(&self) -> &'static str {
      match self {
        Key::Page(_) => "policies",
        Key::Other => "other",
      }
    }

    fn description(&self) -> String {
      format!("{:?}", self)
    }
  }

  fn counting_fetch(
    counter: &Arc<AtomicU32>,
    delay_ms: u64,
  ) -> impl Future<Output = Result<u32, String>> + Send + 'static {
    let counter = counter.clone();
    async move {
      tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
      Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
  }

  #[tokio::test]
  async fn test_fresh_entry_is_served_from_cache() {
    let cache: CacheLayer<Key, u32> = CacheLayer::new();
    let counter = Arc::new(AtomicU32::new(0));

    let first = cache
      .fetch(&Key::Page(1), || counting_fetch(&counter, 0))
      .await
      .unwrap();
    let second = cache
      .fetch(&Key::Page(1), || counting_fetch(&counter, 0))
      .await
      .unwrap();

    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::CacheFresh);
    assert_eq!(second.data, 1);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_concurrent_requests_are_deduplicated() {
    let cache: CacheLayer<Key, u32> = CacheLayer::new();
    let counter = Arc::new(AtomicU32::new(0));

    let (a, b) = tokio::join!(
      cache.fetch(&Key::Page(1), || counting_fetch(&counter, 20)),
      cache.fetch(&Key::Page(1), || counting_fetch(&counter, 20)),
    );

    assert_eq!(a.unwrap().data, 1);
    assert_eq!(b.unwrap().data, 1);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_distinct_keys_fetch_separately() {
    let cache: CacheLayer<Key, u32> = CacheLayer::new();
    let counter = Arc::new(AtomicU32::new(0));

    let (a, b) = tokio::join!(
      cache.fetch(&Key::Page(1), || counting_fetch(&counter, 5)),
      cache.fetch(&Key::Page(2), || counting_fetch(&counter, 5)),
    );

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(cache.len(), 2);
  }

  #[tokio::test]
  async fn test_stale_entry_is_refetched() {
    let cache: CacheLayer<Key, u32> = CacheLayer::new().with_stale_time(Duration::zero());
    let counter = Arc::new(AtomicU32::new(0));

    cache
      .fetch(&Key::Page(1), || counting_fetch(&counter, 0))
      .await
      .unwrap();
    let again = cache
      .fetch(&Key::Page(1), || counting_fetch(&counter, 0))
      .await
      .unwrap();

    assert_eq!(again.source, CacheSource::Network);
    assert_eq!(again.data, 2);
  }

  #[tokio::test]
  async fn test_errors_are_returned_and_not_cached() {
    let cache: CacheLayer<Key, u32> = CacheLayer::new();

    let err = cache
      .fetch(&Key::Page(1), || async { Err::<u32, _>("boom") })
      .await
      .unwrap_err();
    assert_eq!(err, "boom");
    assert_eq!(cache.len(), 0);

    let ok = cache
      .fetch(&Key::Page(1), || async { Ok::<u32, String>(7) })
      .await
      .unwrap();
    assert_eq!(ok.data, 7);
  }

  #[tokio::test]
  async fn test_invalidate_drops_resource_and_bumps_epoch() {
    let cache: CacheLayer<Key, u32> = CacheLayer::new();
    let mut watcher = cache.subscribe();

    cache
      .fetch(&Key::Page(1), || async { Ok::<u32, String>(1) })
      .await
      .unwrap();
    cache
      .fetch(&Key::Other, || async { Ok::<u32, String>(2) })
      .await
      .unwrap();

    cache.invalidate_resource("policies");

    assert!(watcher.has_changed().unwrap());
    assert_eq!(*watcher.borrow_and_update(), 1);
    assert_eq!(cache.len(), 1);

    let refetched = cache
      .fetch(&Key::Page(1), || async { Ok::<u32, String>(10) })
      .await
      .unwrap();
    assert_eq!(refetched.source, CacheSource::Network);
    assert_eq!(refetched.data, 10);
  }

  #[tokio::test]
  async fn test_response_started_before_invalidation_is_not_stored() {
    let cache: CacheLayer<Key, u32> = CacheLayer::new();
    let counter = Arc::new(AtomicU32::new(0));

    let pending = {
      let cache = cache.clone();
      let counter = counter.clone();
      tokio::spawn(async move {
        cache
          .fetch(&Key::Page(1), || counting_fetch(&counter, 30))
          .await
      })
    };

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    cache.invalidate_resource("policies");

    let old = pending.await.unwrap().unwrap();
    assert_eq!(old.data, 1);
    assert_eq!(cache.len(), 0);

    let fresh = cache
      .fetch(&Key::Page(1), || counting_fetch(&counter, 0))
      .await
      .unwrap();
    assert_eq!(fresh.data, 2);
  }
}
