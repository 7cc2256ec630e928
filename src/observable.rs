//! Observables and the combinator surface.
//!
//! An [`Observable`] is a recipe: subscribing consumes it, and re-subscribing
//! is done by cloning it first. Every source and operator in this crate is
//! `Clone` when its parts are.

use std::time::Duration;

use crate::{
  observer::{Observer, ObserverAll},
  ops::{
    filter::FilterOp,
    map_err::MapErrOp,
    merge_delay_error::MergeDelayErrorOp,
    sample::SampleOp,
    take_last::TakeLastOp,
    take_while::{NoIndex, TakeWhileOp, TryWithIndex, WithIndex},
    throttle_first::ThrottleFirstOp,
  },
  scheduler::Scheduler,
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionWrapper},
};

mod boxed;
mod create;
mod from_iter;
mod interval;
mod trivial;

pub use boxed::{BoxedObservable, DynObservable};
pub use create::{create, Create};
pub use from_iter::{empty, from_iter, of, ObservableIter};
pub use interval::{interval, IntervalObservable};
pub use trivial::{never, throw_err, NeverObservable, ThrowObservable};

pub use crate::ops::merge_delay_error::merge_delay_error;

/// A producer of values pushed to an [`Observer`].
///
/// `actual_subscribe` starts the producer and returns the subscription that
/// releases whatever the producer holds. Callers normally go through the
/// `subscribe*` helpers on [`ObservableExt`], which put a
/// [`Subscriber`] in front of the observer.
pub trait Observable: Sized {
  type Item;
  type Err;

  fn actual_subscribe<O>(self, observer: O) -> SharedSubscription
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static;
}

pub trait ObservableExt: Observable {
  /// Emit only those items from an Observable that pass a predicate test.
  #[inline]
  fn filter<F>(self, filter: F) -> FilterOp<Self, F>
  where
    F: FnMut(&Self::Item) -> bool,
  {
    FilterOp { source: self, filter }
  }

  /// Convert the error of this observable.
  #[inline]
  fn map_err<F, OutErr>(self, func: F) -> MapErrOp<Self, F>
  where
    F: FnOnce(Self::Err) -> OutErr,
  {
    MapErrOp { source: self, func }
  }

  /// Emit values while `predicate` returns `true`, then complete and
  /// unsubscribe from the source.
  #[inline]
  fn take_while<F>(self, predicate: F) -> TakeWhileOp<Self, NoIndex<F>>
  where
    F: FnMut(&Self::Item) -> bool,
  {
    TakeWhileOp { source: self, predicate: NoIndex(predicate) }
  }

  /// Like `take_while`, the predicate also receives the zero-based index of
  /// the value.
  #[inline]
  fn take_while_with_index<F>(self, predicate: F) -> TakeWhileOp<Self, WithIndex<F>>
  where
    F: FnMut(&Self::Item, usize) -> bool,
  {
    TakeWhileOp { source: self, predicate: WithIndex(predicate) }
  }

  /// Like `take_while_with_index` with a fallible predicate. An `Err` from
  /// the predicate is emitted as the stream's error.
  #[inline]
  fn try_take_while_with_index<F>(self, predicate: F) -> TakeWhileOp<Self, TryWithIndex<F>>
  where
    F: FnMut(&Self::Item, usize) -> Result<bool, Self::Err>,
  {
    TakeWhileOp { source: self, predicate: TryWithIndex(predicate) }
  }

  /// Emits only the last `count` values emitted by the source Observable.
  ///
  /// The values are buffered until the source completes; an error discards
  /// them.
  #[inline]
  fn take_last(self, count: usize) -> TakeLastOp<Self> { TakeLastOp { source: self, count } }

  /// Emits the most recently emitted value from the source Observable every
  /// `period`, provided a value has been emitted at all.
  ///
  /// # Panics
  /// On subscribe, if `period` is zero.
  #[inline]
  fn sample<Sch>(self, period: Duration, scheduler: Sch) -> SampleOp<Self, Sch>
  where
    Sch: Scheduler,
  {
    SampleOp { source: self, period, scheduler }
  }

  /// Emits a value, then ignores subsequent values for `window`. Windows
  /// start at each emitted value.
  #[inline]
  fn throttle_first<Sch>(self, window: Duration, scheduler: Sch) -> ThrottleFirstOp<Self, Sch>
  where
    Sch: Scheduler,
  {
    ThrottleFirstOp { source: self, window, scheduler }
  }

  /// Flatten an observable of observables, delaying every inner error until
  /// all inner observables and the outer one have terminated.
  #[inline]
  fn merge_delay_error(self) -> MergeDelayErrorOp<Self>
  where
    Self::Item: Observable<Err = Self::Err>,
  {
    MergeDelayErrorOp { source: self }
  }

  /// Erase the concrete type, so that observables built differently can be
  /// stored together, e.g. in the list given to
  /// [`merge_delay_error`](crate::observable::merge_delay_error).
  #[inline]
  fn box_it(self) -> BoxedObservable<Self::Item, Self::Err>
  where
    Self: Send + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    BoxedObservable::new(self)
  }

  /// Subscribe with an [`Observer`] implementation.
  fn subscribe_observer<O>(self, observer: O) -> SubscriptionWrapper<SharedSubscription>
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    let subscription = SharedSubscription::default();
    let upstream = self.actual_subscribe(Subscriber::new(observer, subscription.clone()));
    subscription.add(upstream);
    SubscriptionWrapper(subscription)
  }

  /// Subscribe to values only. An error reaching this subscriber is dropped
  /// and logged at `warn` level.
  fn subscribe<N>(self, next: N) -> SubscriptionWrapper<SharedSubscription>
  where
    N: FnMut(Self::Item) + Send + 'static,
  {
    self.subscribe_observer(ObserverAll::new(
      next,
      |_: Self::Err| tracing::warn!("error dropped by a subscriber without an error handler"),
      || {},
    ))
  }

  fn subscribe_err<N, E>(self, next: N, error: E) -> SubscriptionWrapper<SharedSubscription>
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(Self::Err) + Send + 'static,
  {
    self.subscribe_observer(ObserverAll::new(next, error, || {}))
  }

  fn subscribe_complete<N, C>(self, next: N, complete: C) -> SubscriptionWrapper<SharedSubscription>
  where
    N: FnMut(Self::Item) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    self.subscribe_observer(ObserverAll::new(
      next,
      |_: Self::Err| tracing::warn!("error dropped by a subscriber without an error handler"),
      complete,
    ))
  }

  /// Invokes an execution of an Observable and registers Observer handlers for
  /// notifications it will emit.
  fn subscribe_all<N, E, C>(
    self,
    next: N,
    error: E,
    complete: C,
  ) -> SubscriptionWrapper<SharedSubscription>
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnMut(Self::Err) + Send + 'static,
    C: FnMut() + Send + 'static,
  {
    self.subscribe_observer(ObserverAll::new(next, error, complete))
  }
}

impl<T: Observable> ObservableExt for T {}
