//! Debounced values.
//!
//! A [`Debounced<T>`] holds a raw value that changes on every keystroke and a
//! settled value that only follows once the raw value has been quiet for the
//! configured delay. Only the settled value should feed anything expensive,
//! such as a query key.
//!
//! ```ignore
//! let mut search = Debounced::new(String::new(), Duration::from_millis(500));
//! search.set("ter".to_string());
//! search.set("term".to_string());
//!
//! // In event loop tick
//! if search.poll() {
//!     // search.settled() == "term", once, 500ms after the last keystroke
//! }
//! ```

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A value whose settled copy lags the raw copy by a quiet period.
///
/// Every `set` cancels the pending timer and starts a new one. `reset`
/// cancels it and moves both copies at once. Dropping the value cancels the
/// timer, so nothing fires after teardown.
pub struct Debounced<T> {
  raw: T,
  settled: T,
  delay: Duration,
  timer: Option<JoinHandle<()>>,
  /// Sequence of the latest `set`/`reset`; older timer firings are ignored
  seq: u64,
  tx: mpsc::UnboundedSender<(u64, T)>,
  rx: mpsc::UnboundedReceiver<(u64, T)>,
}

impl<T: Clone + PartialEq + Send + 'static> Debounced<T> {
  pub fn new(initial: T, delay: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      raw: initial.clone(),
      settled: initial,
      delay,
      timer: None,
      seq: 0,
      tx,
      rx,
    }
  }

  /// Latest input
  pub fn raw(&self) -> &T {
    &self.raw
  }

  /// Value after the quiet period
  pub fn settled(&self) -> &T {
    &self.settled
  }

  /// Whether a timer is waiting to settle the raw value
  pub fn is_pending(&self) -> bool {
    self.raw != self.settled
  }

  /// Record new input and restart the quiet period.
  ///
  /// Must be called from within a tokio runtime.
  pub fn set(&mut self, value: T) {
    self.cancel();
    self.raw = value.clone();

    let seq = self.seq;
    let delay = self.delay;
    let tx = self.tx.clone();
    self.timer = Some(tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      let _ = tx.send((seq, value));
    }));
  }

  /// Set raw and settled together, cancelling any pending timer.
  ///
  /// Returns `true` if the settled value changed.
  pub fn reset(&mut self, value: T) -> bool {
    self.cancel();
    self.raw = value.clone();
    let changed = self.settled != value;
    self.settled = value;
    changed
  }

  /// Apply a timer that has fired, if any.
  ///
  /// Returns `true` if the settled value changed. Call this in your event
  /// loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok((seq, value)) = self.rx.try_recv() {
      if seq != self.seq || value == self.settled {
        continue;
      }
      self.settled = value;
      self.timer = None;
      changed = true;
    }
    changed
  }

  /// Abort the pending timer and invalidate anything it already sent
  fn cancel(&mut self) {
    if let Some(timer) = self.timer.take() {
      timer.abort();
    }
    self.seq += 1;
  }
}

impl<T> Drop for Debounced<T> {
  fn drop(&mut self) {
    if let Some(timer) = self.timer.take() {
      timer.abort();
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Debounced<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Debounced")
      .field("raw", &self.raw)
      .field("settled", &self.settled)
      .field("delay", &self.delay)
      .finish_non_exhaustive()
  }
}
