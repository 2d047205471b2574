//! Cached policy client that wraps PolicyClient with transparent caching.

use chrono::Duration;
use tokio::sync::watch;
use tracing::debug;

use crate::cache::{CacheLayer, CacheResult, QueryKey};
use crate::popular::select_popular;

use super::cache::{PolicyQueryKey, POLICIES};
use super::client::PolicyClient;
use super::types::{Policy, PolicyPage, PolicyQuery};

/// Policy client with transparent caching support.
///
/// Reads go through the cache; writes go straight to [`PolicyClient`] and are
/// followed by [`CachedPolicyClient::invalidate_policies`].
#[derive(Clone)]
pub struct CachedPolicyClient {
  inner: PolicyClient,
  pages: CacheLayer<PolicyQueryKey, PolicyPage>,
  details: CacheLayer<PolicyQueryKey, Policy>,
}

impl CachedPolicyClient {
  pub fn new(inner: PolicyClient, stale_time: Duration) -> Self {
    Self {
      inner,
      pages: CacheLayer::new().with_stale_time(stale_time),
      details: CacheLayer::new().with_stale_time(stale_time),
    }
  }

  /// Uncached client, for writes
  pub fn inner(&self) -> &PolicyClient {
    &self.inner
  }

  /// Get one page of the filtered collection with caching.
  pub async fn list_policies(&self, query: &PolicyQuery) -> Result<PolicyPage, String> {
    let key = PolicyQueryKey::List(query.clone());
    let result = self
      .pages
      .fetch(&key, || {
        let inner = self.inner.clone();
        let query = query.clone();
        async move { inner.list_policies(&query).await }
      })
      .await?;

    Ok(served(&key, result))
  }

  /// Get the most purchased policies with caching.
  pub async fn popular_policies(&self) -> Result<Vec<Policy>, String> {
    let key = PolicyQueryKey::All;
    let result = self
      .pages
      .fetch(&key, || {
        let inner = self.inner.clone();
        async move { inner.list_all_policies().await }
      })
      .await?;

    Ok(select_popular(served(&key, result).items))
  }

  /// Get a single policy by id with caching.
  pub async fn get_policy(&self, id: &str) -> Result<Policy, String> {
    let key = PolicyQueryKey::Detail { id: id.to_string() };
    let result = self
      .details
      .fetch(&key, || {
        let inner = self.inner.clone();
        let id = id.to_string();
        async move { inner.get_policy(&id).await }
      })
      .await?;

    Ok(served(&key, result))
  }

  /// Drop every cached policy read and notify watching queries.
  pub fn invalidate_policies(&self) {
    self.pages.invalidate_resource(POLICIES);
    self.details.invalidate_resource(POLICIES);
  }

  /// Watch invalidations of collection reads
  pub fn watch_pages(&self) -> watch::Receiver<u64> {
    self.pages.subscribe()
  }

  /// Watch invalidations of detail reads
  pub fn watch_details(&self) -> watch::Receiver<u64> {
    self.details.subscribe()
  }
}

fn served<T>(key: &PolicyQueryKey, result: CacheResult<T>) -> T {
  debug!(
    read = %key.description(),
    source = ?result.source,
    cached_at = ?result.cached_at,
    "served"
  );
  result.data
}
