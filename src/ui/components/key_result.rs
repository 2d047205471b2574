/// Outcome of offering a key to a component.
///
/// Views try their components in turn and stop at the first one that does
/// not return `NotHandled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, no event for parent to handle
  Handled,
  /// Key was consumed, here's an event for parent to process
  Event(T),
  /// Key was not consumed, parent should try next handler
  NotHandled,
}

impl<T> KeyResult<T> {
  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> KeyResult<U> {
    match self {
      KeyResult::Handled => KeyResult::Handled,
      KeyResult::Event(event) => KeyResult::Event(f(event)),
      KeyResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// Try the next handler only if this one passed on the key
  pub fn or_else(self, next: impl FnOnce() -> KeyResult<T>) -> KeyResult<T> {
    match self {
      KeyResult::NotHandled => next(),
      other => other,
    }
  }
}
