//! Observer trait and implementations
//!
//! The Observer trait defines the consumer of data in the reactive pattern.
//! It provides three methods: next (for values), error (for errors), and
//! complete (for stream completion).

use parking_lot::Mutex;
use std::sync::Arc;

/// Observer trait: The consumer of data in reactive programming
///
/// An Observer receives values, errors, and completion notifications from
/// an Observable. After `error` or `complete` has been delivered once, a
/// well-behaved producer makes no further calls. Producers are not trusted to
/// be well behaved, so every subscription puts a
/// [`Subscriber`](crate::subscriber::Subscriber) in front of the observer to
/// absorb late calls.
pub trait Observer<Item, Err> {
  /// Receive the next value from the observable
  fn next(&mut self, value: Item);

  /// Handle an error from the observable. Terminal.
  fn error(&mut self, err: Err);

  /// Handle completion of the observable. Terminal.
  fn complete(&mut self);

  /// Returns `true` if the observer will not accept more values.
  ///
  /// Synchronous sources (like `from_iter`) poll this to stop emitting early
  /// once a downstream `take_while` or an unsubscribe has closed the chain.
  fn is_finished(&self) -> bool { false }
}

/// Type-erased observer handed to `create` closures and stored by subjects.
pub type BoxedObserver<Item, Err> = Box<dyn Observer<Item, Err> + Send>;

impl<Item, Err, T> Observer<Item, Err> for Box<T>
where
  T: Observer<Item, Err> + ?Sized,
{
  #[inline]
  fn next(&mut self, value: Item) { (**self).next(value) }

  #[inline]
  fn error(&mut self, err: Err) { (**self).error(err) }

  #[inline]
  fn complete(&mut self) { (**self).complete() }

  #[inline]
  fn is_finished(&self) -> bool { (**self).is_finished() }
}

/// Shared observer. Concurrent callers are serialized by the mutex, which is
/// held only for the duration of one call.
impl<Item, Err, O> Observer<Item, Err> for Arc<Mutex<O>>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.lock().next(value) }

  fn error(&mut self, err: Err) { self.lock().error(err) }

  fn complete(&mut self) { self.lock().complete() }

  fn is_finished(&self) -> bool { self.lock().is_finished() }
}

/// Option observer - None ignores all events, Some delegates to inner.
/// Terminal events take the inner observer out.
impl<O, Item, Err> Observer<Item, Err> for Option<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(inner) = self {
      inner.next(value);
    }
  }

  fn error(&mut self, err: Err) {
    if let Some(mut inner) = self.take() {
      inner.error(err);
    }
  }

  fn complete(&mut self) {
    if let Some(mut inner) = self.take() {
      inner.complete();
    }
  }

  fn is_finished(&self) -> bool { self.as_ref().is_none_or(Observer::is_finished) }
}

/// Closure-backed observer used by the `subscribe*` family.
///
/// `next`, `error` and `complete` are the three handlers; the subscribe
/// helpers plug in no-op handlers for the channels the caller ignores.
#[derive(Clone)]
pub struct ObserverAll<N, E, C> {
  next: N,
  error: E,
  complete: C,
}

impl<N, E, C> ObserverAll<N, E, C> {
  #[inline]
  pub fn new(next: N, error: E, complete: C) -> Self { ObserverAll { next, error, complete } }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for ObserverAll<N, E, C>
where
  N: FnMut(Item),
  E: FnMut(Err),
  C: FnMut(),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value); }

  #[inline]
  fn error(&mut self, err: Err) { (self.error)(err); }

  #[inline]
  fn complete(&mut self) { (self.complete)(); }
}
