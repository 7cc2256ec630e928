use std::collections::VecDeque;

use crate::{observable::Observable, observer::Observer, subscription::SharedSubscription};

/// Emits only the last `count` values emitted by the source Observable.
///
/// `take_last` returns an Observable that emits only the last `count` values
/// emitted by the source Observable. If the source emits fewer than `count`
/// values then all of its values are emitted.
/// It will not emit values until source Observable complete.
///
/// # Example
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::from_iter(0..10).take_last(5).subscribe(|v| println!("{}", v));
///
/// // print logs:
/// // 5
/// // 6
/// // 7
/// // 8
/// // 9
/// ```
#[derive(Clone)]
pub struct TakeLastOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

impl<S> Observable for TakeLastOp<S>
where
  S: Observable,
  S::Item: Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, observer: O) -> SharedSubscription
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    self.source.actual_subscribe(TakeLastObserver {
      observer,
      count: self.count,
      queue: VecDeque::with_capacity(self.count.min(64)),
    })
  }
}

/// Newest value at the front, oldest at the back.
pub struct TakeLastObserver<O, Item> {
  observer: O,
  count: usize,
  queue: VecDeque<Item>,
}

impl<Item, Err, O> Observer<Item, Err> for TakeLastObserver<O, Item>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.count == 0 {
      return;
    }
    if self.queue.len() == self.count {
      self.queue.pop_back();
    }
    self.queue.push_front(value);
  }

  fn error(&mut self, err: Err) {
    self.queue.clear();
    self.observer.error(err)
  }

  fn complete(&mut self) {
    while let Some(value) = self.queue.pop_back() {
      if self.observer.is_finished() {
        self.queue.clear();
        return;
      }
      self.observer.next(value);
    }
    self.observer.complete();
  }

  #[inline]
  fn is_finished(&self) -> bool { self.observer.is_finished() }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;
  use proptest::prelude::*;

  use crate::prelude::*;

  fn collect<Item: Send + 'static>(
    source: impl Observable<Item = Item, Err = std::convert::Infallible>,
  ) -> (Vec<Item>, bool) {
    let values = Arc::new(Mutex::new(vec![]));
    let completed = Arc::new(Mutex::new(false));
    let (c_values, c_completed) = (values.clone(), completed.clone());
    source.subscribe_complete(move |v| c_values.lock().push(v), move || *c_completed.lock() = true);
    let values = std::mem::take(&mut *values.lock());
    let completed = *completed.lock();
    (values, completed)
  }

  #[rxcore_macro::test]
  fn keeps_the_tail() {
    let (values, completed) = collect(observable::from_iter(["one", "two", "three"]).take_last(2));
    assert_eq!(values, vec!["two", "three"]);
    assert!(completed);
  }

  #[rxcore_macro::test]
  fn fewer_than_count() {
    let (values, completed) = collect(observable::from_iter(["one"]).take_last(10));
    assert_eq!(values, vec!["one"]);
    assert!(completed);
  }

  #[rxcore_macro::test]
  fn empty_source() {
    let (values, completed) = collect(observable::empty::<i32>().take_last(3));
    assert!(values.is_empty());
    assert!(completed);
  }

  #[rxcore_macro::test]
  fn zero_count_only_completes() {
    let (values, completed) = collect(observable::from_iter(0..5).take_last(0));
    assert!(values.is_empty());
    assert!(completed);
  }

  #[rxcore_macro::test]
  fn error_discards_buffer() {
    let values = Arc::new(Mutex::new(vec![]));
    let errors = Arc::new(Mutex::new(vec![]));
    let (c_values, c_errors) = (values.clone(), errors.clone());
    observable::create(|mut o: BoxedObserver<i32, &'static str>| {
      o.next(1);
      o.next(2);
      o.error("bad");
    })
    .take_last(2)
    .subscribe_err(move |v| c_values.lock().push(v), move |e| c_errors.lock().push(e));
    assert!(values.lock().is_empty());
    assert_eq!(*errors.lock(), vec!["bad"]);
  }

  proptest! {
    #[test]
    fn emits_last_min_n_len_in_order(
      input in proptest::collection::vec(any::<i32>(), 0..64),
      n in 0usize..16,
    ) {
      let (values, completed) = collect(observable::from_iter(input.clone()).take_last(n));
      let skip = input.len().saturating_sub(n);
      prop_assert_eq!(values, input[skip..].to_vec());
      prop_assert!(completed);
    }
  }
}
