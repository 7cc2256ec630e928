use std::{convert::Infallible, time::Duration};

use crate::{
  observable::Observable, observer::Observer, scheduler::Scheduler,
  subscription::SharedSubscription,
};

/// Creates an observable which will fire at `period` time into the future,
/// and will repeat every `period` interval after. Values are the tick index
/// starting at 0. Never completes.
pub fn interval<Sch>(period: Duration, scheduler: Sch) -> IntervalObservable<Sch> {
  IntervalObservable { period, scheduler }
}

#[derive(Clone)]
pub struct IntervalObservable<Sch> {
  scheduler: Sch,
  period: Duration,
}

impl<Sch: Scheduler> Observable for IntervalObservable<Sch> {
  type Item = usize;
  type Err = Infallible;

  fn actual_subscribe<O>(self, mut observer: O) -> SharedSubscription
  where
    O: Observer<usize, Infallible> + Send + 'static,
  {
    let Self { scheduler, period } = self;
    scheduler.schedule_periodic(
      move |seq| {
        if !observer.is_finished() {
          observer.next(seq);
        }
      },
      period,
    )
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn ticks_on_virtual_time() {
    let scheduler = VirtualTimeScheduler::new();
    let ticks = Arc::new(Mutex::new(vec![]));
    let c_ticks = ticks.clone();
    let mut subscription = observable::interval(Duration::from_millis(10), scheduler.clone())
      .subscribe(move |v| c_ticks.lock().push(v));

    scheduler.advance_time_by(Duration::from_millis(45));
    assert_eq!(*ticks.lock(), vec![0, 1, 2, 3]);

    subscription.unsubscribe();
    scheduler.advance_time_by(Duration::from_millis(100));
    assert_eq!(ticks.lock().len(), 4);
  }

  #[cfg(feature = "pooled-scheduler")]
  #[rxcore_macro::test]
  fn ticks_on_pool() {
    let ticks = Arc::new(Mutex::new(0));
    let c_ticks = ticks.clone();
    let start = std::time::Instant::now();
    let subscription = observable::interval(Duration::from_millis(2), PooledScheduler::default())
      .take_while(|v| *v < 4)
      .subscribe(move |_| *c_ticks.lock() += 1);

    while !subscription.is_closed() && start.elapsed() < Duration::from_secs(5) {
      std::thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(*ticks.lock(), 4);
    assert!(start.elapsed() >= Duration::from_millis(8));
  }
}
