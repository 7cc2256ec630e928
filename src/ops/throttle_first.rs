use std::{
  sync::atomic::{AtomicU64, Ordering},
  time::Duration,
};

use crate::{
  observable::Observable, observer::Observer, ops::filter::FilterOp, scheduler::Scheduler,
  subscription::SharedSubscription,
};

/// Emits a value from the source, then ignores subsequent source values for
/// `window`, then repeats.
///
/// The window is measured from the last value that was let through, on the
/// scheduler's clock. Terminal notifications pass through untouched.
#[derive(Clone)]
pub struct ThrottleFirstOp<S, Sch> {
  pub(crate) source: S,
  pub(crate) window: Duration,
  pub(crate) scheduler: Sch,
}

impl<S, Sch> Observable for ThrottleFirstOp<S, Sch>
where
  S: Observable,
  Sch: Scheduler,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, observer: O) -> SharedSubscription
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    let ThrottleFirstOp { source, window, scheduler } = self;
    let gate = ThrottleGate::new(window, scheduler);
    FilterOp { source, filter: move |_: &S::Item| gate.try_accept() }.actual_subscribe(observer)
  }
}

/// No value accepted yet.
const NONE_ACCEPTED: u64 = u64::MAX;

/// Leading-edge admission on a scheduler clock.
struct ThrottleGate<Sch> {
  window: Duration,
  scheduler: Sch,
  last_accepted: AtomicU64,
}

impl<Sch: Scheduler> ThrottleGate<Sch> {
  fn new(window: Duration, scheduler: Sch) -> Self {
    ThrottleGate { window, scheduler, last_accepted: AtomicU64::new(NONE_ACCEPTED) }
  }

  fn try_accept(&self) -> bool {
    let now = as_nanos(self.scheduler.now());
    let window = as_nanos(self.window);
    let mut last = self.last_accepted.load(Ordering::Acquire);
    loop {
      if last != NONE_ACCEPTED && now.saturating_sub(last) < window {
        return false;
      }
      match self
        .last_accepted
        .compare_exchange_weak(last, now, Ordering::AcqRel, Ordering::Acquire)
      {
        Ok(_) => return true,
        Err(actual) => last = actual,
      }
    }
  }
}

fn as_nanos(d: Duration) -> u64 { u64::try_from(d.as_nanos()).unwrap_or(NONE_ACCEPTED - 1) }
