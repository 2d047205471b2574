//! Async query abstraction for keyed data fetching.
//!
//! `Query<K, T>` owns one keyed read: it spawns the fetch, tracks loading
//! and failure, and keeps the last good value on screen while a new key
//! loads.
//!
//! # Example
//!
//! ```ignore
//! let policies = cached_client.clone();
//! let mut query = Query::new(move |q: PolicyQuery| {
//!     let policies = policies.clone();
//!     async move { policies.list_policies(&q).await }
//! })
//! .with_invalidation(cached_client.watch_pages());
//!
//! // Start fetching for the current filters
//! query.set_key(filters.query());
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render: previous page stays visible while the next one loads
//! match query.data() {
//!     Some(page) => render_page(page, query.is_placeholder()),
//!     None if query.is_loading() => render_spinner(),
//!     None => render_error(query.error()),
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Nothing requested yet
  Idle,
  Loading,
  Success(T),
  /// Message of the last failed fetch
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching data for a key
type FetcherFn<K, T> = Box<dyn Fn(K) -> BoxFuture<T> + Send + Sync>;

/// Async query for keyed data fetching with state management.
///
/// Query<K, T> encapsulates:
/// - The fetching logic (via a closure taking the key)
/// - Loading/success/error states
/// - The previous result, kept as placeholder while a new key loads
/// - Async result handling via channels; a response for a superseded key is
///   dropped with its channel and never shown
/// - Optional invalidation watching and stale time tracking
pub struct Query<K, T> {
  key: Option<K>,
  state: QueryState<T>,
  placeholder: Option<T>,
  fetcher: FetcherFn<K, T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  invalidations: Option<watch::Receiver<u64>>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
}

impl<K: Clone + PartialEq + Send + 'static, T: Clone + Send + 'static> Query<K, T> {
  /// `fetcher` builds the read for a key. It runs on every key change and
  /// every refetch.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      key: None,
      state: QueryState::Idle,
      placeholder: None,
      fetcher: Box::new(move |key| Box::pin(fetcher(key))),
      receiver: None,
      invalidations: None,
      fetched_at: None,
      stale_time: Duration::from_secs(5 * 60),
    }
  }

  /// Age after which [`Query::refresh_if_stale`] fetches again
  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  /// Refetch whenever the given invalidation counter moves.
  pub fn with_invalidation(mut self, mut invalidations: watch::Receiver<u64>) -> Self {
    invalidations.borrow_and_update();
    self.invalidations = Some(invalidations);
    self
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Data to render: the current result, or while loading the previous one.
  pub fn data(&self) -> Option<&T> {
    match &self.state {
      QueryState::Success(data) => Some(data),
      QueryState::Loading => self.placeholder.as_ref(),
      _ => None,
    }
  }

  /// Whether `data()` is the previous result shown while loading.
  pub fn is_placeholder(&self) -> bool {
    self.state.is_loading() && self.placeholder.is_some()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  #[cfg(test)]
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Older than the stale time, or never fetched
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success(_) => self
        .fetched_at
        .map(|t| t.elapsed() >= self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Point the query at a key, fetching if it differs from the current one.
  ///
  /// Returns `true` if a fetch was started.
  pub fn set_key(&mut self, key: K) -> bool {
    if self.key.as_ref() == Some(&key) && !self.state.is_error() {
      return false;
    }
    self.key = Some(key);
    self.start_fetch();
    true
  }

  /// Force a refetch of the current key, dropping any pending response.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.start_fetch();
  }

  /// Refetch if the data is older than the stale time.
  pub fn refresh_if_stale(&mut self) {
    if self.is_stale() {
      self.refetch();
    }
  }

  /// Poll for invalidations and results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived, error occurred or a
  /// refetch started). Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let invalidated = self
      .invalidations
      .as_mut()
      .is_some_and(|rx| rx.has_changed().unwrap_or(false));
    if invalidated {
      if let Some(rx) = self.invalidations.as_mut() {
        rx.borrow_and_update();
      }
      if self.key.is_some() {
        self.refetch();
        return true;
      }
    }

    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.placeholder = None;
        self.fetched_at = Some(Instant::now());
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.placeholder = None;
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.placeholder = None;
        self.receiver = None;
        true
      }
    }
  }

  // Spawn the fetcher for the current key
  fn start_fetch(&mut self) {
    let key = match &self.key {
      Some(key) => key.clone(),
      None => return,
    };

    // Keep whatever is on screen until the new result lands
    if let QueryState::Success(data) = &self.state {
      self.placeholder = Some(data.clone());
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)(key);
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.

impl<K: std::fmt::Debug, T: std::fmt::Debug> std::fmt::Debug for Query<K, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}
