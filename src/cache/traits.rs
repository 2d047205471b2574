//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for keys that identify a cached read.
///
/// Every key belongs to a resource (e.g. "policies"). Invalidation works on
/// whole resources, so all reads of a collection are dropped together.
pub trait QueryKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {
  /// Resource this read belongs to
  fn resource(&self) -> &'static str;

  /// Human-readable description for logs
  fn description(&self) -> String;
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network (possibly shared with a concurrent caller)
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
}
