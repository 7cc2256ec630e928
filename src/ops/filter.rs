use crate::{observable::Observable, observer::Observer, subscription::SharedSubscription};

/// Emit only those items from an Observable that pass a predicate test
/// # Example
///
/// ```
/// use rxcore::prelude::*;
/// use std::sync::Arc;
/// use parking_lot::Mutex;
///
/// let coll = Arc::new(Mutex::new(vec![]));
/// let coll_clone = coll.clone();
///
/// observable::from_iter(0..10)
///   .filter(|v| *v % 2 == 0)
///   .subscribe(move |v| coll_clone.lock().push(v));
///
/// // only even numbers received.
/// assert_eq!(*coll.lock(), vec![0, 2, 4, 6, 8]);
/// ```
#[derive(Clone)]
pub struct FilterOp<S, F> {
  pub(crate) source: S,
  pub(crate) filter: F,
}

impl<S, F> Observable for FilterOp<S, F>
where
  S: Observable,
  F: FnMut(&S::Item) -> bool + Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, observer: O) -> SharedSubscription
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    self
      .source
      .actual_subscribe(FilterObserver { observer, filter: self.filter })
  }
}

pub struct FilterObserver<O, F> {
  observer: O,
  filter: F,
}

impl<Item, Err, O, F> Observer<Item, Err> for FilterObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnMut(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if (self.filter)(&value) {
      self.observer.next(value)
    }
  }

  #[inline]
  fn error(&mut self, err: Err) { self.observer.error(err) }

  #[inline]
  fn complete(&mut self) { self.observer.complete() }

  #[inline]
  fn is_finished(&self) -> bool { self.observer.is_finished() }
}
