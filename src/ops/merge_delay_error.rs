//! Flattening with delayed errors.
//!
//! Values from every inner observable are forwarded as they arrive. An inner
//! error is buffered and only delivered once the outer observable and every
//! inner observable have terminated; several buffered errors are folded with
//! [`FromComposite`]. An error from the outer observable itself is delivered
//! at once.

use std::{
  collections::VecDeque,
  convert::Infallible,
  sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
  },
};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::{
  error::FromComposite,
  observable::{from_iter, Observable, ObservableIter},
  observer::Observer,
  ops::map_err::MapErrOp,
  subscriber::Subscriber,
  subscription::{ClosureSubscription, SharedSubscription, SubscriptionLike},
};

/// The observable returned by [`merge_delay_error`] for a fixed list of
/// sources.
pub type MergeDelayErrorList<S> =
  MergeDelayErrorOp<MapErrOp<ObservableIter<Vec<S>>, fn(Infallible) -> <S as Observable>::Err>>;

/// Merge a fixed list of observables, delaying their errors until all of them
/// have terminated.
///
/// All sources share one type; [`box_it`](crate::observable::ObservableExt::box_it)
/// brings differently built sources to a common one.
///
/// ```
/// use rxcore::prelude::*;
///
/// let first = observable::create(|mut o: BoxedObserver<i32, RxError>| {
///   o.next(1);
///   o.error(RxError::msg("first failed"));
/// })
/// .box_it();
/// let second = observable::create(|mut o: BoxedObserver<i32, RxError>| {
///   o.next(2);
///   o.complete();
/// })
/// .box_it();
///
/// observable::merge_delay_error([first, second]).subscribe_all(
///   |v| println!("{v}"),
///   |e| println!("after every value: {e}"),
///   || unreachable!(),
/// );
/// ```
pub fn merge_delay_error<I>(sources: I) -> MergeDelayErrorList<I::Item>
where
  I: IntoIterator,
  I::Item: Observable,
{
  let absurd: fn(Infallible) -> <I::Item as Observable>::Err = |never| match never {};
  MergeDelayErrorOp {
    source: MapErrOp { source: from_iter(sources.into_iter().collect::<Vec<_>>()), func: absurd },
  }
}

#[derive(Clone)]
pub struct MergeDelayErrorOp<S> {
  pub(crate) source: S,
}

impl<S> Observable for MergeDelayErrorOp<S>
where
  S: Observable,
  S::Item: Observable<Err = S::Err>,
  <S::Item as Observable>::Item: Send + 'static,
  S::Err: FromComposite + Send + 'static,
{
  type Item = <S::Item as Observable>::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, observer: O) -> SharedSubscription
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    let subscription = SharedSubscription::default();
    let state = Arc::new(MergeState {
      observer: Mutex::new(Subscriber::new(observer, subscription.clone())),
      pending: Mutex::new(VecDeque::new()),
      emitting: AtomicBool::new(false),
      stopped: AtomicBool::new(false),
      active: AtomicUsize::new(1),
      children: DashMap::new(),
      errors: Mutex::new(vec![]),
      next_id: AtomicUsize::new(0),
    });

    let c_state = state.clone();
    subscription.add(ClosureSubscription::new(move || c_state.stop()));

    let parent = self
      .source
      .actual_subscribe(MergeParentObserver { state, done: false });
    subscription.add(parent);
    subscription
  }
}

enum Notification<Item, Err> {
  Next(Item),
  Error(Err),
  Complete,
}

struct MergeState<O, Item, Err> {
  /// Only touched by the thread holding `emitting`.
  observer: Mutex<Subscriber<O>>,
  pending: Mutex<VecDeque<Notification<Item, Err>>>,
  /// Emission token. Whoever sets it drains `pending`, including what other
  /// threads, or its own downstream callbacks, enqueue meanwhile.
  emitting: AtomicBool,
  /// Set once by whoever decides the terminal notification, or by
  /// cancellation.
  stopped: AtomicBool,
  /// Children in flight, plus one for the parent until it completes.
  active: AtomicUsize,
  children: DashMap<usize, SharedSubscription>,
  errors: Mutex<Vec<Err>>,
  next_id: AtomicUsize,
}

impl<O, Item, Err> MergeState<O, Item, Err> {
  #[inline]
  fn is_stopped(&self) -> bool { self.stopped.load(Ordering::Acquire) }

  fn stop(&self) {
    self.stopped.store(true, Ordering::Release);
    self.cancel_children();
  }

  fn cancel_children(&self) {
    let children: Vec<_> = self
      .children
      .iter()
      .map(|entry| entry.value().clone())
      .collect();
    self.children.clear();
    for mut child in children {
      child.unsubscribe();
    }
  }
}

impl<O, Item, Err> MergeState<O, Item, Err>
where
  O: Observer<Item, Err>,
  Err: FromComposite,
{
  /// Deliver `notification` downstream, serialized with every other
  /// delivery. Never blocks on the downstream observer, so a downstream
  /// callback may feed another merged source.
  fn emit(&self, notification: Notification<Item, Err>) {
    self.pending.lock().push_back(notification);
    if self
      .emitting
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      return;
    }
    loop {
      let notification = {
        let mut pending = self.pending.lock();
        match pending.pop_front() {
          Some(notification) => notification,
          None => {
            // released under the queue lock so a concurrent push either
            // lands before this check or finds the token free
            self.emitting.store(false, Ordering::Release);
            return;
          }
        }
      };
      let mut observer = self.observer.lock();
      match notification {
        Notification::Next(value) => observer.next(value),
        Notification::Error(err) => observer.error(err),
        Notification::Complete => observer.complete(),
      }
    }
  }

  /// One member (a child or the parent) reached its terminal state.
  fn member_done(&self) {
    if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
      self.finish();
    }
  }

  fn finish(&self) {
    if self
      .stopped
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      return;
    }
    let mut errors = std::mem::take(&mut *self.errors.lock());
    match errors.len() {
      0 => {
        tracing::debug!("merge_delay_error completed");
        self.emit(Notification::Complete);
      }
      1 => {
        tracing::debug!("merge_delay_error terminated with one delayed error");
        if let Some(err) = errors.pop() {
          self.emit(Notification::Error(err));
        }
      }
      n => {
        tracing::debug!(errors = n, "merge_delay_error terminated with a composite error");
        self.emit(Notification::Error(Err::from_errors(errors)));
      }
    }
  }
}

struct MergeParentObserver<O, Item, Err> {
  state: Arc<MergeState<O, Item, Err>>,
  done: bool,
}

impl<O, C, Err> Observer<C, Err> for MergeParentObserver<O, C::Item, Err>
where
  C: Observable<Err = Err>,
  C::Item: Send + 'static,
  O: Observer<C::Item, Err> + Send + 'static,
  Err: FromComposite + Send + 'static,
{
  fn next(&mut self, child: C) {
    if self.done || self.state.is_stopped() {
      return;
    }
    let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
    self.state.active.fetch_add(1, Ordering::AcqRel);
    let slot = SharedSubscription::default();
    self.state.children.insert(id, slot.clone());
    if self.state.is_stopped() {
      // cancelled between the check above and the registration
      self.state.children.remove(&id);
      return;
    }

    let unsub = child.actual_subscribe(MergeChildObserver {
      state: self.state.clone(),
      id,
      finished: false,
    });
    slot.add(unsub);
  }

  fn error(&mut self, err: Err) {
    if self.done {
      return;
    }
    self.done = true;
    if self
      .state
      .stopped
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
    {
      tracing::debug!("merge_delay_error source failed, error forwarded without delay");
      self.state.cancel_children();
      self.state.emit(Notification::Error(err));
    }
  }

  fn complete(&mut self) {
    if self.done {
      return;
    }
    self.done = true;
    self.state.member_done();
  }

  fn is_finished(&self) -> bool { self.done || self.state.is_stopped() }
}

struct MergeChildObserver<O, Item, Err> {
  state: Arc<MergeState<O, Item, Err>>,
  id: usize,
  finished: bool,
}

impl<O, Item, Err> MergeChildObserver<O, Item, Err>
where
  O: Observer<Item, Err>,
  Err: FromComposite,
{
  fn done(&mut self) {
    self.finished = true;
    self.state.children.remove(&self.id);
    self.state.member_done();
  }
}

impl<O, Item, Err> Observer<Item, Err> for MergeChildObserver<O, Item, Err>
where
  O: Observer<Item, Err>,
  Err: FromComposite,
{
  fn next(&mut self, value: Item) {
    if self.finished || self.state.is_stopped() {
      return;
    }
    self.state.emit(Notification::Next(value));
  }

  fn error(&mut self, err: Err) {
    if self.finished {
      return;
    }
    self.state.errors.lock().push(err);
    self.done();
  }

  fn complete(&mut self) {
    if self.finished {
      return;
    }
    self.done();
  }

  fn is_finished(&self) -> bool { self.finished || self.state.is_stopped() }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{
      atomic::{AtomicUsize, Ordering},
      Arc,
    },
    thread::JoinHandle,
  };

  use parking_lot::Mutex;

  use crate::{prelude::*, subscription::ClosureSubscription};

  #[derive(Debug, Clone, PartialEq)]
  enum Event {
    Next(&'static str),
    Error(RxError),
    Complete,
  }

  fn record<S>(source: S) -> (Arc<Mutex<Vec<Event>>>, SubscriptionWrapper<SharedSubscription>)
  where
    S: Observable<Item = &'static str, Err = RxError>,
  {
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    let subscription = source.subscribe_all(
      move |v| l1.lock().push(Event::Next(v)),
      move |e| l2.lock().push(Event::Error(e)),
      move || l3.lock().push(Event::Complete),
    );
    (log, subscription)
  }

  /// Emits `values` in order; `None` is emitted as an error named after its
  /// position.
  fn values_then_error(
    values: Vec<Option<&'static str>>,
  ) -> impl Observable<Item = &'static str, Err = RxError> + Clone {
    observable::create(move |mut o: BoxedObserver<&'static str, RxError>| {
      for (i, v) in values.into_iter().enumerate() {
        match v {
          Some(v) => o.next(v),
          None => o.error(RxError::msg(format!("missing value at {i}"))),
        }
      }
      o.complete();
    })
  }

  fn values(log: &Mutex<Vec<Event>>) -> Vec<&'static str> {
    let mut values: Vec<_> = log
      .lock()
      .iter()
      .filter_map(|e| match e {
        Event::Next(v) => Some(*v),
        _ => None,
      })
      .collect();
    values.sort_unstable();
    values
  }

  fn terminals(log: &Mutex<Vec<Event>>) -> Vec<Event> {
    log
      .lock()
      .iter()
      .filter(|e| !matches!(e, Event::Next(_)))
      .cloned()
      .collect()
  }

  #[rxcore_macro::test]
  fn single_error_is_delayed_and_forwarded_as_is() {
    let o1 = values_then_error(vec![Some("four"), None, Some("six")]);
    let o2 = values_then_error(vec![Some("one"), Some("two"), Some("three")]);
    let (log, _) = record(observable::merge_delay_error([o1, o2]));

    assert_eq!(values(&log), vec!["four", "one", "three", "two"]);
    assert_eq!(terminals(&log), vec![Event::Error(RxError::msg("missing value at 1"))]);
  }

  #[rxcore_macro::test]
  fn error_waits_for_later_sources() {
    let o1 = values_then_error(vec![Some("one"), Some("two"), Some("three")]);
    let o2 = values_then_error(vec![Some("four"), None, Some("six")]);
    let o3 = values_then_error(vec![Some("seven"), Some("eight")]);
    let o4 = values_then_error(vec![Some("nine")]);
    let (log, _) = record(observable::merge_delay_error([o1, o2, o3, o4]));

    let events = log.lock().clone();
    assert_eq!(events.last(), Some(&Event::Error(RxError::msg("missing value at 1"))));
    assert_eq!(events.len(), 8);
    assert!(!events.contains(&Event::Next("six")));
    assert!(!events.contains(&Event::Complete));
  }

  #[rxcore_macro::test]
  fn two_errors_become_a_composite() {
    let o1 = values_then_error(vec![Some("one"), None]);
    let o2 = values_then_error(vec![Some("two"), Some("three"), None]);
    let (log, _) = record(observable::merge_delay_error([o1, o2]));

    assert_eq!(values(&log), vec!["one", "three", "two"]);
    match terminals(&log).as_slice() {
      [Event::Error(RxError::Composite(composite))] => {
        assert_eq!(composite.len(), 2);
        assert_eq!(
          composite.errors(),
          &[RxError::msg("missing value at 1"), RxError::msg("missing value at 2")]
        );
      }
      other => panic!("expected one composite error, got {other:?}"),
    }
  }

  #[rxcore_macro::test]
  fn all_sources_complete() {
    let o1 = values_then_error(vec![Some("one"), Some("two")]);
    let o2 = values_then_error(vec![Some("three")]);
    let (log, _) = record(observable::merge_delay_error([o1, o2]));
    assert_eq!(values(&log), vec!["one", "three", "two"]);
    assert_eq!(terminals(&log), vec![Event::Complete]);
  }

  #[rxcore_macro::test]
  fn empty_list_completes() {
    let sources: Vec<observable::ThrowObservable<&'static str, RxError>> = vec![];
    let (log, _) = record(observable::merge_delay_error(sources));
    assert_eq!(*log.lock(), vec![Event::Complete]);
  }

  /// Emits from its own thread; the join handle is kept for the test.
  fn threaded(
    values: Vec<Option<&'static str>>,
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
  ) -> impl Observable<Item = &'static str, Err = RxError> {
    observable::create(move |mut o: BoxedObserver<&'static str, RxError>| {
      let handle = std::thread::spawn(move || {
        for (i, v) in values.into_iter().enumerate() {
          match v {
            Some(v) => o.next(v),
            None => {
              o.error(RxError::msg(format!("missing value at {i}")));
              return;
            }
          }
        }
        o.complete();
      });
      handles.lock().push(handle);
    })
  }

  #[rxcore_macro::test]
  fn threaded_children() {
    for _ in 0..20 {
      let handles = Arc::new(Mutex::new(vec![]));
      let sources = vec![
        threaded(vec![Some("one"), Some("two"), Some("three")], handles.clone()),
        threaded(vec![Some("four"), Some("five"), Some("six")], handles.clone()),
        threaded(vec![Some("seven"), Some("eight")], handles.clone()),
        threaded(vec![Some("nine"), None], handles.clone()),
      ];
      let (log, _) = record(observable::merge_delay_error(sources));
      let joins: Vec<_> = handles.lock().drain(..).collect();
      for h in joins {
        h.join().unwrap();
      }

      assert_eq!(
        values(&log),
        vec!["eight", "five", "four", "nine", "one", "seven", "six", "three", "two"]
      );
      assert_eq!(terminals(&log), vec![Event::Error(RxError::msg("missing value at 1"))]);
    }
  }

  #[rxcore_macro::test]
  fn threaded_children_all_complete_once() {
    for _ in 0..20 {
      let handles = Arc::new(Mutex::new(vec![]));
      let sources: Vec<_> = (0..8)
        .map(|_| threaded(vec![Some("a"), Some("b"), Some("c")], handles.clone()))
        .collect();
      let (log, _) = record(observable::merge_delay_error(sources));
      let joins: Vec<_> = handles.lock().drain(..).collect();
      for h in joins {
        h.join().unwrap();
      }
      assert_eq!(values(&log).len(), 24);
      assert_eq!(terminals(&log), vec![Event::Complete]);
    }
  }

  #[rxcore_macro::test]
  fn unsubscribe_cancels_every_child() {
    let released = Arc::new(AtomicUsize::new(0));
    let child = |released: Arc<AtomicUsize>| {
      observable::create(move |_: BoxedObserver<&'static str, RxError>| {
        ClosureSubscription::new(move || {
          released.fetch_add(1, Ordering::SeqCst);
        })
      })
    };
    let sources = vec![child(released.clone()), child(released.clone()), child(released.clone())];
    let (log, mut subscription) = record(observable::merge_delay_error(sources));

    assert_eq!(released.load(Ordering::SeqCst), 0);
    subscription.unsubscribe();
    assert_eq!(released.load(Ordering::SeqCst), 3);
    assert!(log.lock().is_empty());
  }

  #[rxcore_macro::test]
  fn parent_error_is_not_delayed() {
    let parent = Subject::<Subject<&'static str, RxError>, RxError>::new();
    let child = Subject::<&'static str, RxError>::new();
    let (log, _) = record(parent.clone().merge_delay_error());

    parent.next(child.clone());
    child.next("one");
    assert_eq!(child.subscribed_size(), 1);

    parent.error(RxError::msg("parent failed"));
    assert_eq!(
      *log.lock(),
      vec![Event::Next("one"), Event::Error(RxError::msg("parent failed"))]
    );
    assert_eq!(child.subscribed_size(), 0);

    child.next("two");
    child.complete();
    assert_eq!(log.lock().len(), 2);
  }

  #[rxcore_macro::test]
  fn stream_of_streams_waits_for_parent_and_children() {
    let parent = Subject::<Subject<&'static str, RxError>, RxError>::new();
    let a = Subject::<&'static str, RxError>::new();
    let b = Subject::<&'static str, RxError>::new();
    let (log, _) = record(parent.clone().merge_delay_error());

    parent.next(a.clone());
    parent.next(b.clone());
    a.next("a1");
    b.error(RxError::msg("b failed"));
    a.next("a2");
    a.complete();
    assert_eq!(*log.lock(), vec![Event::Next("a1"), Event::Next("a2")]);

    parent.complete();
    assert_eq!(
      *log.lock(),
      vec![Event::Next("a1"), Event::Next("a2"), Event::Error(RxError::msg("b failed"))]
    );
  }

  #[rxcore_macro::test]
  fn late_child_keeps_stream_open() {
    let parent = Subject::<Subject<&'static str, RxError>, RxError>::new();
    let a = Subject::<&'static str, RxError>::new();
    let (log, _) = record(parent.clone().merge_delay_error());

    parent.next(a.clone());
    parent.complete();
    assert!(log.lock().is_empty());

    a.next("x");
    a.complete();
    assert_eq!(*log.lock(), vec![Event::Next("x"), Event::Complete]);
  }

  #[rxcore_macro::test]
  fn downstream_callback_feeds_a_sibling() {
    let parent = Subject::<Subject<&'static str, RxError>, RxError>::new();
    let a = Subject::<&'static str, RxError>::new();
    let b = Subject::<&'static str, RxError>::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    let c_b = b.clone();
    parent.clone().merge_delay_error().subscribe(move |v| {
      c_log.lock().push(v);
      if v == "a1" {
        c_b.next("b1");
      }
    });

    parent.next(a.clone());
    parent.next(b.clone());
    a.next("a1");
    a.next("a2");
    assert_eq!(*log.lock(), vec!["a1", "b1", "a2"]);
  }

  #[rxcore_macro::test]
  fn differently_built_sources_merge_once_boxed() {
    let created = observable::create(|mut o: BoxedObserver<&'static str, RxError>| {
      o.next("one");
      o.complete();
    });
    let listed = observable::from_iter(["two", "three"])
      .map_err(|never: std::convert::Infallible| -> RxError { match never {} });
    let failing = observable::throw_err(RxError::msg("late"));

    let (log, _) = record(observable::merge_delay_error([
      created.box_it(),
      listed.box_it(),
      failing.box_it(),
    ]));
    assert_eq!(values(&log), vec!["one", "three", "two"]);
    assert_eq!(terminals(&log), vec![Event::Error(RxError::msg("late"))]);
  }
}
