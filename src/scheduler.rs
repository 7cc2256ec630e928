//! Schedulers decide where and when a unit of work runs.
//!
//! - [`ImmediateScheduler`] runs work on the calling thread, trampolining
//!   nested work instead of recursing.
//! - [`PooledScheduler`] submits work to a tokio worker pool (feature
//!   `pooled-scheduler`).
//! - [`VirtualTimeScheduler`] runs work only when a test advances its logical
//!   clock.
//!
//! Every `schedule` returns a [`SharedSubscription`]; unsubscribing it before
//! the work runs prevents the work from running.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::subscription::{SharedSubscription, SubscriptionLike};

mod immediate_scheduler;
#[cfg(feature = "pooled-scheduler")]
mod pooled_scheduler;
mod virtual_time_scheduler;

pub use immediate_scheduler::ImmediateScheduler;
#[cfg(feature = "pooled-scheduler")]
pub use pooled_scheduler::{PooledScheduler, SpawnHandle};
pub use virtual_time_scheduler::VirtualTimeScheduler;

/// Origin of the wall clock shared by the real schedulers.
static CLOCK_ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

/// Time elapsed since the process-wide clock origin.
pub(crate) fn wall_clock() -> Duration { CLOCK_ORIGIN.elapsed() }

/// A Scheduler is an object to order task and schedule their execution.
pub trait Scheduler: Clone + Send + Sync + 'static {
  /// The scheduler's notion of the current time.
  fn now(&self) -> Duration;

  /// Run `task(state)` as soon as possible (`delay == None`) or no earlier
  /// than `now() + delay`.
  fn schedule<S, F>(&self, task: F, delay: Option<Duration>, state: S) -> SharedSubscription
  where
    S: Send + 'static,
    F: FnOnce(S) + Send + 'static;

  /// Run `task` every `period`, first at `now() + period`. The task receives
  /// the tick index, starting at 0. Unsubscribing the returned subscription
  /// stops the ticks.
  fn schedule_periodic<F>(&self, task: F, period: Duration) -> SharedSubscription
  where
    F: FnMut(usize) + Send + 'static,
  {
    let subscription = SharedSubscription::default();
    let task = Arc::new(Mutex::new(task));
    schedule_tick(self.clone(), task, period, 0, subscription.clone());
    subscription
  }
}

fn schedule_tick<Sch, F>(
  scheduler: Sch,
  task: Arc<Mutex<F>>,
  period: Duration,
  seq: usize,
  subscription: SharedSubscription,
) where
  Sch: Scheduler,
  F: FnMut(usize) + Send + 'static,
{
  if subscription.is_closed() {
    return;
  }
  let c_scheduler = scheduler.clone();
  let c_subscription = subscription.clone();
  let handle = scheduler.schedule(
    move |seq| {
      if c_subscription.is_closed() {
        return;
      }
      (*task.lock())(seq);
      schedule_tick(c_scheduler, task, period, seq + 1, c_subscription);
    },
    Some(period),
    seq,
  );
  subscription.add(handle);
}
