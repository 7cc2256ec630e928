//! Cancellation handles.
//!
//! Every `subscribe` returns a subscription. [`SharedSubscription`] is the
//! workhorse: a cloneable, thread-safe handle that owns a list of teardowns
//! and walks the `Active → Terminating → Terminated` state machine exactly
//! once, no matter how many threads race to close it.

use std::{
  fmt::{Debug, Formatter},
  sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;
use smallvec::SmallVec;

/// Subscription returns from `Observable.subscribe(Subscriber)` to allow
/// unsubscribing.
pub trait SubscriptionLike {
  /// This allows deregistering an stream before it has finished receiving all
  /// events (i.e. before onCompleted is called).
  fn unsubscribe(&mut self);

  fn is_closed(&self) -> bool;
}

const ACTIVE: u8 = 0;
const TERMINATING: u8 = 1;
const TERMINATED: u8 = 2;

type Teardown = Box<dyn SubscriptionLike + Send>;

struct Inner {
  state: AtomicU8,
  teardown: Mutex<SmallVec<[Teardown; 1]>>,
}

impl Default for Inner {
  fn default() -> Self { Inner { state: AtomicU8::new(ACTIVE), teardown: Mutex::new(SmallVec::new()) } }
}

/// A thread-safe subscription that can be cloned and closed from any thread.
///
/// All clones share the same state. The first close, whether it comes from
/// [`SubscriptionLike::unsubscribe`] or from [`SharedSubscription::close_with`],
/// wins a single compare-and-set and performs the release; every later close
/// is a no-op.
#[derive(Clone, Default)]
pub struct SharedSubscription(Arc<Inner>);

impl SharedSubscription {
  /// Register a teardown released when this subscription closes.
  ///
  /// If the subscription is already closing or closed, `subscription` is
  /// released immediately instead.
  pub fn add<S: SubscriptionLike + Send + 'static>(&self, subscription: S) {
    if self.is_same(&subscription) {
      return;
    }
    let mut subscription = subscription;
    {
      let mut teardown = self.0.teardown.lock();
      if self.0.state.load(Ordering::Acquire) == ACTIVE {
        teardown.retain(|v| !v.is_closed());
        teardown.push(Box::new(subscription));
        return;
      }
    }
    subscription.unsubscribe();
  }

  /// Run `f` as the winner of the close race, then release every teardown.
  ///
  /// Returns `None` without running `f` when another caller already closed
  /// this subscription. Observers use this to make a terminal notification
  /// and the cancellation of their upstream one atomic step.
  pub fn close_with<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
    if self
      .0
      .state
      .compare_exchange(ACTIVE, TERMINATING, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      return None;
    }
    let res = f();
    let teardown = std::mem::take(&mut *self.0.teardown.lock());
    for mut v in teardown {
      v.unsubscribe();
    }
    self.0.state.store(TERMINATED, Ordering::Release);
    Some(res)
  }

  /// Whether no close has happened yet.
  #[inline]
  pub fn is_active(&self) -> bool { self.0.state.load(Ordering::Acquire) == ACTIVE }

  /// Whether the release work has fully finished.
  #[inline]
  pub fn is_terminated(&self) -> bool { self.0.state.load(Ordering::Acquire) == TERMINATED }

  /// Number of teardowns still registered.
  pub(crate) fn teardown_size(&self) -> usize { self.0.teardown.lock().len() }

  fn is_same(&self, other: &dyn std::any::Any) -> bool {
    other
      .downcast_ref::<Self>()
      .is_some_and(|other| Arc::ptr_eq(&self.0, &other.0))
  }
}

impl SubscriptionLike for SharedSubscription {
  #[inline]
  fn unsubscribe(&mut self) {
    if self.close_with(|| ()).is_none() {
      tracing::trace!("subscription already closed, unsubscribe ignored");
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { !self.is_active() }
}

impl Debug for SharedSubscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SharedSubscription")
      .field("state", &self.0.state.load(Ordering::Relaxed))
      .field("teardown_count", &self.0.teardown.lock().len())
      .finish()
  }
}

/// A subscription that runs a closure once when unsubscribed.
pub struct ClosureSubscription<F>(Option<F>);

impl<F: FnOnce()> ClosureSubscription<F> {
  pub fn new(f: F) -> Self { ClosureSubscription(Some(f)) }
}

impl<F: FnOnce()> SubscriptionLike for ClosureSubscription<F> {
  fn unsubscribe(&mut self) {
    if let Some(f) = self.0.take() {
      f();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_none() }
}

/// Nothing to release.
impl SubscriptionLike for () {
  #[inline]
  fn unsubscribe(&mut self) {}

  #[inline]
  fn is_closed(&self) -> bool { true }
}

impl<T: ?Sized> SubscriptionLike for Box<T>
where
  T: SubscriptionLike,
{
  #[inline]
  fn unsubscribe(&mut self) {
    let s = &mut **self;
    s.unsubscribe()
  }

  #[inline]
  fn is_closed(&self) -> bool {
    let s = &**self;
    s.is_closed()
  }
}

/// Wrapper around a subscription which provides the
/// `unsubscribe_when_dropped()` method.
#[derive(Clone, Debug)]
pub struct SubscriptionWrapper<T: SubscriptionLike>(pub(crate) T);

impl<T: SubscriptionLike> SubscriptionWrapper<T> {
  /// Activates "RAII" behavior for this subscription. That means
  /// `unsubscribe()` will be called automatically as soon as the returned
  /// value goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `unsubscribe()` is called immediately, which is probably not what you
  /// want!
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard<T> { SubscriptionGuard(self.0) }

  /// Consumes this wrapper and returns the underlying subscription.
  pub fn into_inner(self) -> T { self.0 }
}

impl<T: SubscriptionLike> SubscriptionLike for SubscriptionWrapper<T> {
  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
  #[inline]
  fn unsubscribe(&mut self) { self.0.unsubscribe() }
}

/// An RAII implementation of a "scoped subscribed" of a subscription.
/// When this structure is dropped (falls out of scope), the subscription will
/// be unsubscribed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: SubscriptionLike>(pub(crate) T);

impl<T: SubscriptionLike> SubscriptionGuard<T> {
  /// Wraps an existing subscription with a guard to enable RAII behavior for
  /// it.
  pub fn new(subscription: T) -> SubscriptionGuard<T> { SubscriptionGuard(subscription) }
}

impl<T: SubscriptionLike> Drop for SubscriptionGuard<T> {
  #[inline]
  fn drop(&mut self) { self.0.unsubscribe() }
}
