use std::marker::PhantomData;

use crate::{
  observable::Observable,
  observer::{BoxedObserver, Observer},
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// Creates an observable from a function that drives an observer.
///
/// The function receives a boxed observer, already behind the safety
/// wrapper, so calls made after a terminal notification or after the
/// subscriber unsubscribed are dropped. It may hand the observer to another
/// thread. Whatever it returns is released when the subscription closes.
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::create(|mut o: BoxedObserver<i32, RxError>| {
///   o.next(1);
///   o.next(2);
///   o.complete();
/// })
/// .subscribe(|v| println!("{v}"));
/// ```
pub fn create<F, Item, Err, U>(subscribe: F) -> Create<F, Item, Err>
where
  F: FnOnce(BoxedObserver<Item, Err>) -> U,
  U: SubscriptionLike + Send + 'static,
{
  Create { subscribe, _marker: PhantomData }
}

pub struct Create<F, Item, Err> {
  subscribe: F,
  _marker: PhantomData<fn() -> (Item, Err)>,
}

impl<F: Clone, Item, Err> Clone for Create<F, Item, Err> {
  fn clone(&self) -> Self { Create { subscribe: self.subscribe.clone(), _marker: PhantomData } }
}

impl<F, Item, Err, U> Observable for Create<F, Item, Err>
where
  F: FnOnce(BoxedObserver<Item, Err>) -> U,
  U: SubscriptionLike + Send + 'static,
  Item: 'static,
  Err: 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe<O>(self, observer: O) -> SharedSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let subscription = SharedSubscription::default();
    let subscriber = Subscriber::new(observer, subscription.clone());
    let teardown = (self.subscribe)(Box::new(subscriber));
    subscription.add(teardown);
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use parking_lot::Mutex;

  use crate::{prelude::*, subscription::ClosureSubscription};

  #[rxcore_macro::test]
  fn proxy_call() {
    let next = Arc::new(AtomicUsize::new(0));
    let err = Arc::new(AtomicUsize::new(0));
    let complete = Arc::new(AtomicUsize::new(0));
    let (c_next, c_err, c_complete) = (next.clone(), err.clone(), complete.clone());

    observable::create(|mut subscriber: BoxedObserver<i32, &'static str>| {
      subscriber.next(1);
      subscriber.next(2);
      subscriber.next(3);
      subscriber.complete();
      subscriber.next(3);
      subscriber.error("never dispatch error");
    })
    .subscribe_all(
      move |_| {
        c_next.fetch_add(1, Ordering::SeqCst);
      },
      move |_| {
        c_err.fetch_add(1, Ordering::SeqCst);
      },
      move || {
        c_complete.fetch_add(1, Ordering::SeqCst);
      },
    );

    assert_eq!(next.load(Ordering::SeqCst), 3);
    assert_eq!(complete.load(Ordering::SeqCst), 1);
    assert_eq!(err.load(Ordering::SeqCst), 0);
  }

  #[rxcore_macro::test]
  fn teardown_runs_on_unsubscribe() {
    let released = Arc::new(AtomicUsize::new(0));
    let c_released = released.clone();
    let mut subscription = observable::create(move |_: BoxedObserver<i32, ()>| {
      ClosureSubscription::new(move || {
        c_released.fetch_add(1, Ordering::SeqCst);
      })
    })
    .subscribe(|_| {});

    assert_eq!(released.load(Ordering::SeqCst), 0);
    subscription.unsubscribe();
    subscription.unsubscribe();
    assert_eq!(released.load(Ordering::SeqCst), 1);
  }

  #[rxcore_macro::test]
  fn teardown_runs_after_sync_completion() {
    let released = Arc::new(AtomicUsize::new(0));
    let c_released = released.clone();
    observable::create(move |mut o: BoxedObserver<i32, ()>| {
      o.complete();
      ClosureSubscription::new(move || {
        c_released.fetch_add(1, Ordering::SeqCst);
      })
    })
    .subscribe(|_| {});
    assert_eq!(released.load(Ordering::SeqCst), 1);
  }

  #[rxcore_macro::test]
  fn emits_from_another_thread() {
    let values = Arc::new(Mutex::new(vec![]));
    let c_values = values.clone();
    let worker = Arc::new(Mutex::new(None));
    let c_worker = worker.clone();
    observable::create(move |mut o: BoxedObserver<i32, ()>| {
      *c_worker.lock() = Some(std::thread::spawn(move || {
        for v in 0..5 {
          o.next(v);
        }
        o.complete();
      }));
    })
    .subscribe(move |v| c_values.lock().push(v));

    let handle = worker.lock().take().unwrap();
    handle.join().unwrap();
    assert_eq!(*values.lock(), vec![0, 1, 2, 3, 4]);
  }
}
