/// Outcome of offering a key to a component.
///
/// Views chain components with it: the first component that does not
/// answer `NotHandled` owns the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed, nothing for the parent to do
  Handled,
  /// Consumed, and the parent should act on this event
  Event(T),
  /// Not consumed; offer it to the next handler
  NotHandled,
}

impl<T> KeyResult<T> {
  /// Try `next` only when this handler passed on the key.
  pub fn or_else(self, next: impl FnOnce() -> KeyResult<T>) -> KeyResult<T> {
    match self {
      KeyResult::NotHandled => next(),
      handled => handled,
    }
  }
}
