use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  time::Duration,
};

use parking_lot::Mutex;

use crate::{
  observable::Observable,
  observer::Observer,
  scheduler::Scheduler,
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// Emits the most recent source value on every tick of a periodic clock.
///
/// Nothing is emitted before the source's first value. After that every
/// tick emits the latest value, even if it was already emitted by an earlier
/// tick. Source termination stops the clock and is forwarded.
#[derive(Clone)]
pub struct SampleOp<S, Sch> {
  pub(crate) source: S,
  pub(crate) period: Duration,
  pub(crate) scheduler: Sch,
}

struct SampleState<O, Item> {
  observer: Mutex<Subscriber<O>>,
  has_value: AtomicBool,
  latest: Mutex<Option<Item>>,
}

impl<O, Item> SampleState<O, Item> {
  fn emit_latest<Err>(&self)
  where
    O: Observer<Item, Err>,
    Item: Clone,
  {
    if !self.has_value.load(Ordering::Acquire) {
      return;
    }
    let latest = self.latest.lock().clone();
    if let Some(value) = latest {
      self.observer.lock().next(value);
    }
  }
}

impl<S, Sch> Observable for SampleOp<S, Sch>
where
  S: Observable,
  S::Item: Clone + Send + 'static,
  S::Err: 'static,
  Sch: Scheduler,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, observer: O) -> SharedSubscription
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    let SampleOp { source, period, scheduler } = self;
    assert!(!period.is_zero(), "sample period must be non-zero");

    let subscription = SharedSubscription::default();
    let state = Arc::new(SampleState {
      observer: Mutex::new(Subscriber::new(observer, subscription.clone())),
      has_value: AtomicBool::new(false),
      latest: Mutex::new(None),
    });

    let c_state = state.clone();
    let clock = scheduler.schedule_periodic(
      move |_| c_state.emit_latest::<S::Err>(),
      period,
    );
    subscription.add(clock.clone());

    let upstream = source.actual_subscribe(SampleObserver { state, clock });
    subscription.add(upstream);
    subscription
  }
}

struct SampleObserver<O, Item> {
  state: Arc<SampleState<O, Item>>,
  clock: SharedSubscription,
}

impl<O, Item, Err> Observer<Item, Err> for SampleObserver<O, Item>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    *self.state.latest.lock() = Some(value);
    self.state.has_value.store(true, Ordering::Release);
  }

  fn error(&mut self, err: Err) {
    self.clock.unsubscribe();
    self.state.observer.lock().error(err);
  }

  fn complete(&mut self) {
    self.clock.unsubscribe();
    self.state.observer.lock().complete();
  }

  fn is_finished(&self) -> bool { self.state.observer.lock().is_finished() }
}
