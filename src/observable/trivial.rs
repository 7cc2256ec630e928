use std::marker::PhantomData;

use crate::{observable::Observable, observer::Observer, subscription::SharedSubscription};

/// Creates an observable that emits no items, just terminates with an error.
pub fn throw_err<Item, Err>(e: Err) -> ThrowObservable<Item, Err> {
  ThrowObservable { err: e, _marker: PhantomData }
}

/// Creates an observable that never emits anything and never terminates.
///
/// Useful as a child that keeps a combinator open, e.g. in tests of
/// cancellation.
pub fn never<Item, Err>() -> NeverObservable<Item, Err> { NeverObservable(PhantomData) }

pub struct ThrowObservable<Item, Err> {
  err: Err,
  _marker: PhantomData<fn() -> Item>,
}

impl<Item, Err: Clone> Clone for ThrowObservable<Item, Err> {
  fn clone(&self) -> Self { ThrowObservable { err: self.err.clone(), _marker: PhantomData } }
}

impl<Item, Err> Observable for ThrowObservable<Item, Err> {
  type Item = Item;
  type Err = Err;

  fn actual_subscribe<O>(self, mut observer: O) -> SharedSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    observer.error(self.err);
    SharedSubscription::default()
  }
}

pub struct NeverObservable<Item, Err>(PhantomData<fn() -> (Item, Err)>);

impl<Item, Err> Clone for NeverObservable<Item, Err> {
  fn clone(&self) -> Self { NeverObservable(PhantomData) }
}

impl<Item, Err> Observable for NeverObservable<Item, Err> {
  type Item = Item;
  type Err = Err;

  fn actual_subscribe<O>(self, _observer: O) -> SharedSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    SharedSubscription::default()
  }
}
