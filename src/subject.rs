//! A hot, multicasting source.

use std::{
  cell::RefCell,
  sync::{Arc, Weak},
};

use parking_lot::Mutex;

use crate::{
  observable::Observable,
  observer::{BoxedObserver, Observer},
  subscription::{ClosureSubscription, SharedSubscription},
};

thread_local! {
  /// Subjects delivering a notification on this thread, by address.
  static EMITTING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a subject as delivering on the current thread until dropped.
struct EmittingGuard(usize);

impl EmittingGuard {
  fn enter(id: usize) -> Self {
    let reentered = EMITTING.with(|emitting| {
      let mut emitting = emitting.borrow_mut();
      if emitting.contains(&id) {
        true
      } else {
        emitting.push(id);
        false
      }
    });
    if reentered {
      panic!(
        "re-entrant Subject emissions are not supported (next/error/complete). Emit through a \
         scheduler if you need a feedback loop."
      );
    }
    EmittingGuard(id)
  }
}

impl Drop for EmittingGuard {
  fn drop(&mut self) { EMITTING.with(|emitting| emitting.borrow_mut().retain(|id| *id != self.0)); }
}

type SharedObserver<Item, Err> = Arc<Mutex<BoxedObserver<Item, Err>>>;

enum Status<Err> {
  Active,
  Completed,
  Errored(Err),
}

struct Inner<Item, Err> {
  observers: Vec<(usize, SharedObserver<Item, Err>)>,
  next_id: usize,
  status: Status<Err>,
}

/// Multicasts every notification to the observers subscribed at that moment.
///
/// Late subscribers miss earlier values. After `complete` or `error`, new
/// subscribers receive that terminal notification immediately. Clones share
/// the same observer list.
///
/// Delivery happens outside the subject's lock, so observers may subscribe
/// or unsubscribe from within a callback.
///
/// # Panics
///
/// Emissions are not re-entrant: calling `next`, `error` or `complete` on a
/// subject from within one of its own callbacks panics.
pub struct Subject<Item, Err> {
  inner: Arc<Mutex<Inner<Item, Err>>>,
}

impl<Item, Err> Clone for Subject<Item, Err> {
  fn clone(&self) -> Self { Subject { inner: self.inner.clone() } }
}

impl<Item, Err> Default for Subject<Item, Err> {
  fn default() -> Self {
    Subject {
      inner: Arc::new(Mutex::new(Inner {
        observers: vec![],
        next_id: 0,
        status: Status::Active,
      })),
    }
  }
}

impl<Item, Err> Subject<Item, Err> {
  pub fn new() -> Self { Self::default() }

  /// Number of observers currently subscribed.
  pub fn subscribed_size(&self) -> usize { self.inner.lock().observers.len() }

  fn enter(&self) -> EmittingGuard { EmittingGuard::enter(Arc::as_ptr(&self.inner) as usize) }

  fn snapshot(&self) -> Vec<SharedObserver<Item, Err>> {
    let inner = self.inner.lock();
    inner.observers.iter().map(|(_, o)| o.clone()).collect()
  }

  fn terminate(&self, status: Status<Err>) -> Option<Vec<SharedObserver<Item, Err>>> {
    let mut inner = self.inner.lock();
    if !matches!(inner.status, Status::Active) {
      tracing::trace!("subject already terminated, notification dropped");
      return None;
    }
    inner.status = status;
    Some(inner.observers.drain(..).map(|(_, o)| o).collect())
  }

  pub fn next(&self, value: Item)
  where
    Item: Clone,
  {
    let _emitting = self.enter();
    for observer in self.snapshot() {
      observer.lock().next(value.clone());
    }
  }

  pub fn error(&self, err: Err)
  where
    Err: Clone,
  {
    let _emitting = self.enter();
    if let Some(observers) = self.terminate(Status::Errored(err.clone())) {
      for observer in observers {
        observer.lock().error(err.clone());
      }
    }
  }

  pub fn complete(&self) {
    let _emitting = self.enter();
    if let Some(observers) = self.terminate(Status::Completed) {
      for observer in observers {
        observer.lock().complete();
      }
    }
  }
}

impl<Item: Clone, Err: Clone> Observer<Item, Err> for Subject<Item, Err> {
  #[inline]
  fn next(&mut self, value: Item) { Subject::next(self, value) }

  #[inline]
  fn error(&mut self, err: Err) { Subject::error(self, err) }

  #[inline]
  fn complete(&mut self) { Subject::complete(self) }

  fn is_finished(&self) -> bool { !matches!(self.inner.lock().status, Status::Active) }
}

impl<Item, Err> Observable for Subject<Item, Err>
where
  Item: 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe<O>(self, mut observer: O) -> SharedSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let mut inner = self.inner.lock();
    let terminal = match &inner.status {
      Status::Active => None,
      Status::Completed => Some(None),
      Status::Errored(err) => Some(Some(err.clone())),
    };
    if let Some(terminal) = terminal {
      drop(inner);
      match terminal {
        Some(err) => observer.error(err),
        None => observer.complete(),
      }
      return SharedSubscription::default();
    }

    let id = inner.next_id;
    inner.next_id += 1;
    let boxed: BoxedObserver<Item, Err> = Box::new(observer);
    inner.observers.push((id, Arc::new(Mutex::new(boxed))));
    drop(inner);

    let weak: Weak<Mutex<Inner<Item, Err>>> = Arc::downgrade(&self.inner);
    let subscription = SharedSubscription::default();
    subscription.add(ClosureSubscription::new(move || {
      if let Some(inner) = weak.upgrade() {
        inner.lock().observers.retain(|(i, _)| *i != id);
      }
    }));
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::{convert::Infallible, sync::Arc};

  use parking_lot::Mutex;

  use crate::prelude::*;

  #[rxcore_macro::test]
  fn multicasts_to_current_subscribers() {
    let subject = Subject::<i32, Infallible>::new();
    let a = Arc::new(Mutex::new(vec![]));
    let b = Arc::new(Mutex::new(vec![]));
    let c_a = a.clone();
    subject.clone().subscribe(move |v| c_a.lock().push(v));
    subject.next(1);
    let c_b = b.clone();
    subject.clone().subscribe(move |v| c_b.lock().push(v));
    subject.next(2);

    assert_eq!(*a.lock(), vec![1, 2]);
    assert_eq!(*b.lock(), vec![2]);
  }

  #[rxcore_macro::test]
  fn unsubscribe_removes_observer() {
    let subject = Subject::<i32, Infallible>::new();
    let mut subscription = subject.clone().subscribe(|_| {});
    assert_eq!(subject.subscribed_size(), 1);
    subscription.unsubscribe();
    assert_eq!(subject.subscribed_size(), 0);
  }

  #[rxcore_macro::test]
  fn late_subscriber_gets_terminal() {
    let subject = Subject::<i32, String>::new();
    subject.error("gone".to_owned());
    subject.next(1);
    subject.complete();

    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    subject.clone().subscribe_err(|_| {}, move |e| c_seen.lock().push(e));
    assert_eq!(*seen.lock(), vec!["gone".to_owned()]);
    assert_eq!(subject.subscribed_size(), 0);
  }

  #[rxcore_macro::test]
  fn emits_from_many_threads() {
    let subject = Subject::<usize, Infallible>::new();
    let total = Arc::new(Mutex::new(0));
    let c_total = total.clone();
    subject.clone().subscribe(move |v| *c_total.lock() += v);

    let workers: Vec<_> = (0..4)
      .map(|_| {
        let subject = subject.clone();
        std::thread::spawn(move || {
          for v in 0..100 {
            subject.next(v);
          }
        })
      })
      .collect();
    for w in workers {
      w.join().unwrap();
    }
    assert_eq!(*total.lock(), 4 * (0..100).sum::<usize>());
  }

  #[rxcore_macro::test]
  #[should_panic(expected = "re-entrant Subject emissions are not supported")]
  fn emitting_from_own_callback_panics() {
    let subject = Subject::<i32, Infallible>::new();
    let c_subject = subject.clone();
    subject.clone().subscribe(move |v| {
      if v == 1 {
        c_subject.next(2);
      }
    });
    subject.next(1);
  }

  #[rxcore_macro::test]
  fn emitting_into_another_subject_from_callback() {
    let first = Subject::<i32, Infallible>::new();
    let second = Subject::<i32, Infallible>::new();
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    second.clone().subscribe(move |v| c_seen.lock().push(v));
    let c_second = second.clone();
    first.clone().subscribe(move |v| c_second.next(v * 10));

    first.next(1);
    first.next(2);
    assert_eq!(*seen.lock(), vec![10, 20]);
  }

  #[rxcore_macro::test]
  fn recovers_after_a_rejected_reentrant_emission() {
    let subject = Subject::<i32, Infallible>::new();
    let c_subject = subject.clone();
    subject.clone().subscribe(move |v| {
      if v == 1 {
        c_subject.next(2);
      }
    });
    let c_subject = subject.clone();
    let outcome = std::thread::spawn(move || c_subject.next(1)).join();
    assert!(outcome.is_err());

    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    subject.clone().subscribe(move |v| c_seen.lock().push(v));
    subject.next(3);
    assert_eq!(*seen.lock(), vec![3]);
  }
}
