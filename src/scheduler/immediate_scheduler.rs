use std::{cell::RefCell, collections::VecDeque, thread, time::Duration};

use super::{wall_clock, Scheduler};
use crate::subscription::{SharedSubscription, SubscriptionLike};

type Job = Box<dyn FnOnce()>;

thread_local! {
  /// Work queued by `schedule` calls made while this thread is already
  /// draining. `None` when no drain is in progress.
  static TRAMPOLINE: RefCell<Option<VecDeque<Job>>> = const { RefCell::new(None) };
}

/// Runs work on the calling thread.
///
/// The first `schedule` on a thread becomes the drain loop: it runs its own
/// job, then every job that was scheduled meanwhile, in FIFO order. A nested
/// `schedule` only enqueues, so recursion depth stays constant no matter how
/// deeply actions schedule further actions.
///
/// The delayed form blocks the calling thread until the due time, which is
/// fixed when `schedule` is called.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn now(&self) -> Duration { wall_clock() }

  fn schedule<S, F>(&self, task: F, delay: Option<Duration>, state: S) -> SharedSubscription
  where
    S: Send + 'static,
    F: FnOnce(S) + Send + 'static,
  {
    let subscription = SharedSubscription::default();
    let due = delay.map(|d| self.now() + d);
    let c_subscription = subscription.clone();
    let job: Job = Box::new(move || {
      let mut subscription = c_subscription;
      if let Some(due) = due {
        let now = wall_clock();
        if due > now {
          thread::sleep(due - now);
        }
      }
      if !subscription.is_closed() {
        task(state);
      }
      subscription.unsubscribe();
    });
    trampoline(job);
    subscription
  }
}

fn trampoline(job: Job) {
  let draining = TRAMPOLINE.with(|q| {
    let mut q = q.borrow_mut();
    match q.as_mut() {
      Some(queue) => {
        queue.push_back(job);
        None
      }
      None => {
        *q = Some(VecDeque::new());
        Some(job)
      }
    }
  });

  let Some(first) = draining else {
    tracing::trace!("immediate scheduler: job queued on trampoline");
    return;
  };

  let _reset = DrainGuard;
  first();
  while let Some(job) = TRAMPOLINE.with(|q| q.borrow_mut().as_mut().and_then(VecDeque::pop_front)) {
    job();
  }
}

/// Clears the trampoline when the outermost drain ends, including by panic,
/// so the next `schedule` on this thread starts a fresh drain.
struct DrainGuard;

impl Drop for DrainGuard {
  fn drop(&mut self) { TRAMPOLINE.with(|q| q.borrow_mut().take()); }
}
