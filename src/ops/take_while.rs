//! TakeWhile operator implementation
//!
//! Emits values from the source observable as long as a predicate holds.
//! The first value that fails the predicate completes the stream and
//! unsubscribes from the source.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
  observable::Observable, observer::Observer, subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// The three predicate flavours of `take_while` behind one call shape.
///
/// `Ok(false)` ends the stream with `complete`; `Err` ends it with `error`.
pub trait TakeWhilePredicate<Item, Err> {
  fn test(&mut self, value: &Item, index: usize) -> Result<bool, Err>;
}

/// Predicate that ignores the index.
#[derive(Clone)]
pub struct NoIndex<F>(pub F);

/// Predicate that receives the zero-based index.
#[derive(Clone)]
pub struct WithIndex<F>(pub F);

/// Fallible predicate that receives the zero-based index.
#[derive(Clone)]
pub struct TryWithIndex<F>(pub F);

impl<Item, Err, F> TakeWhilePredicate<Item, Err> for NoIndex<F>
where
  F: FnMut(&Item) -> bool,
{
  #[inline]
  fn test(&mut self, value: &Item, _: usize) -> Result<bool, Err> { Ok((self.0)(value)) }
}

impl<Item, Err, F> TakeWhilePredicate<Item, Err> for WithIndex<F>
where
  F: FnMut(&Item, usize) -> bool,
{
  #[inline]
  fn test(&mut self, value: &Item, index: usize) -> Result<bool, Err> {
    Ok((self.0)(value, index))
  }
}

impl<Item, Err, F> TakeWhilePredicate<Item, Err> for TryWithIndex<F>
where
  F: FnMut(&Item, usize) -> Result<bool, Err>,
{
  #[inline]
  fn test(&mut self, value: &Item, index: usize) -> Result<bool, Err> { (self.0)(value, index) }
}

/// TakeWhile operator: Emits values while a predicate returns true
///
/// # Examples
///
/// ```
/// use rxcore::prelude::*;
/// use std::sync::Arc;
/// use parking_lot::Mutex;
///
/// let result = Arc::new(Mutex::new(vec![]));
/// let c_result = result.clone();
/// observable::from_iter([1, 2, 3, 4, 5])
///   .take_while(|v| *v < 4)
///   .subscribe(move |v| c_result.lock().push(v));
/// assert_eq!(*result.lock(), vec![1, 2, 3]);
/// ```
#[derive(Clone)]
pub struct TakeWhileOp<S, P> {
  pub(crate) source: S,
  pub(crate) predicate: P,
}

impl<S, P> Observable for TakeWhileOp<S, P>
where
  S: Observable,
  P: TakeWhilePredicate<S::Item, S::Err> + Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, observer: O) -> SharedSubscription
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    let subscription = SharedSubscription::default();
    let observer = TakeWhileObserver {
      observer: Subscriber::new(observer, subscription.clone()),
      predicate: self.predicate,
      index: AtomicUsize::new(0),
    };
    let upstream = self.source.actual_subscribe(observer);
    subscription.add(upstream);
    subscription
  }
}

/// Stops its subscriber, and with it the source, on the first value that
/// fails the predicate.
pub struct TakeWhileObserver<O, P> {
  observer: Subscriber<O>,
  predicate: P,
  index: AtomicUsize,
}

impl<O, P, Item, Err> Observer<Item, Err> for TakeWhileObserver<O, P>
where
  O: Observer<Item, Err>,
  P: TakeWhilePredicate<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.observer.is_finished() {
      return;
    }
    let index = self.index.fetch_add(1, Ordering::Relaxed);
    match self.predicate.test(&value, index) {
      Ok(true) => self.observer.next(value),
      Ok(false) => self.observer.complete(),
      Err(err) => self.observer.error(err),
    }
  }

  #[inline]
  fn error(&mut self, err: Err) { self.observer.error(err) }

  #[inline]
  fn complete(&mut self) { self.observer.complete() }

  #[inline]
  fn is_finished(&self) -> bool { self.observer.is_finished() }
}
