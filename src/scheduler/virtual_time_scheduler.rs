//! Deterministic scheduler for testing time-based operators.
//!
//! Time only moves when a test calls [`VirtualTimeScheduler::advance_time_to`]
//! or one of its conveniences. Work due at the same instant runs in the order
//! it was scheduled.
//!
//! ```rust
//! use std::time::Duration;
//! use rxcore::prelude::*;
//!
//! let scheduler = VirtualTimeScheduler::new();
//! let values = std::sync::Arc::new(parking_lot::Mutex::new(vec![]));
//! let c_values = values.clone();
//! observable::interval(Duration::from_millis(100), scheduler.clone())
//!   .subscribe(move |v| c_values.lock().push(v));
//!
//! scheduler.advance_time_by(Duration::from_millis(250));
//! assert_eq!(*values.lock(), vec![0, 1]);
//! ```

use std::{cmp::Ordering, collections::BinaryHeap, sync::Arc, time::Duration};

use parking_lot::Mutex;

use super::Scheduler;
use crate::subscription::{SharedSubscription, SubscriptionLike};

struct ScheduledAction {
  due: Duration,
  seq: u64,
  action: Box<dyn FnOnce() + Send>,
  handle: SharedSubscription,
}

impl PartialEq for ScheduledAction {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for ScheduledAction {}

impl PartialOrd for ScheduledAction {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ScheduledAction {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by seq
    other
      .due
      .cmp(&self.due)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

#[derive(Default)]
struct State {
  now: Duration,
  queue: BinaryHeap<ScheduledAction>,
  next_seq: u64,
}

/// A scheduler whose clock is advanced by hand.
///
/// Clones share one clock and one queue. Actions never run on `schedule`;
/// they run inside `advance_time_to` / `advance_time_by` /
/// `trigger_actions`, on the calling thread, with the lock released.
#[derive(Clone, Default)]
pub struct VirtualTimeScheduler {
  state: Arc<Mutex<State>>,
}

impl VirtualTimeScheduler {
  pub fn new() -> Self { Self::default() }

  /// Run every action due at or before `time`, earliest first, moving the
  /// clock to each action's due time before running it. The clock ends at
  /// `time`, or stays where it was if `time` is in the past.
  pub fn advance_time_to(&self, time: Duration) {
    loop {
      let next = {
        let mut state = self.state.lock();
        match state.queue.peek() {
          Some(head) if head.due <= time => {
            let head = state.queue.pop();
            if let Some(head) = &head {
              state.now = state.now.max(head.due);
            }
            head
          }
          _ => None,
        }
      };
      let Some(ScheduledAction { action, mut handle, .. }) = next else {
        break;
      };
      if !handle.is_closed() {
        action();
      }
      handle.unsubscribe();
    }
    let mut state = self.state.lock();
    state.now = state.now.max(time);
  }

  pub fn advance_time_by(&self, delta: Duration) {
    let target = self.now() + delta;
    self.advance_time_to(target);
  }

  /// Run whatever is due at the current time without moving the clock.
  pub fn trigger_actions(&self) { self.advance_time_to(self.now()); }

  /// Number of queued actions, cancelled ones included.
  pub fn pending_count(&self) -> usize { self.state.lock().queue.len() }
}

impl Scheduler for VirtualTimeScheduler {
  fn now(&self) -> Duration { self.state.lock().now }

  fn schedule<S, F>(&self, task: F, delay: Option<Duration>, state: S) -> SharedSubscription
  where
    S: Send + 'static,
    F: FnOnce(S) + Send + 'static,
  {
    let handle = SharedSubscription::default();
    let mut inner = self.state.lock();
    let due = inner.now + delay.unwrap_or_default();
    let seq = inner.next_seq;
    inner.next_seq += 1;
    inner.queue.push(ScheduledAction {
      due,
      seq,
      action: Box::new(move || task(state)),
      handle: handle.clone(),
    });
    handle
  }
}
