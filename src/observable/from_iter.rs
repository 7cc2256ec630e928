use std::{
  convert::Infallible,
  iter::{Empty, Once},
};

use crate::{observable::Observable, observer::Observer, subscription::SharedSubscription};

/// Creates an observable that produces values from an iterator.
///
/// Completes when all elements have been emitted. Never emits an error.
/// Stops early once the subscriber no longer accepts values.
///
/// # Examples
///
/// ```
/// use rxcore::prelude::*;
///
/// observable::from_iter(vec![0, 1, 2, 3]).subscribe(|v| println!("{v},"));
/// ```
pub fn from_iter<Iter>(iter: Iter) -> ObservableIter<Iter>
where
  Iter: IntoIterator,
{
  ObservableIter(iter)
}

/// Creates an observable producing a single value, then completing.
pub fn of<Item>(v: Item) -> ObservableIter<Once<Item>> { from_iter(std::iter::once(v)) }

/// Creates an observable that completes immediately without values.
pub fn empty<Item>() -> ObservableIter<Empty<Item>> { from_iter(std::iter::empty()) }

#[derive(Clone)]
pub struct ObservableIter<Iter>(Iter);

impl<Iter> Observable for ObservableIter<Iter>
where
  Iter: IntoIterator,
{
  type Item = Iter::Item;
  type Err = Infallible;

  fn actual_subscribe<O>(self, mut observer: O) -> SharedSubscription
  where
    O: Observer<Self::Item, Infallible> + Send + 'static,
  {
    for v in self.0 {
      if observer.is_finished() {
        return SharedSubscription::default();
      }
      observer.next(v);
    }
    if !observer.is_finished() {
      observer.complete();
    }
    SharedSubscription::default()
  }
}
