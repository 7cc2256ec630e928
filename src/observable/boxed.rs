//! Type-erased observables.
//!
//! Every source and operator has its own concrete type, so observables built
//! from different closures or operator chains cannot share a `Vec`. Boxing
//! erases that type and keeps only `Item` and `Err`.

use crate::{
  observable::Observable,
  observer::{BoxedObserver, Observer},
  subscription::SharedSubscription,
};

/// Object-safe subscribe, implemented for every observable.
pub trait DynObservable<Item, Err> {
  fn dyn_subscribe(self: Box<Self>, observer: BoxedObserver<Item, Err>) -> SharedSubscription;
}

impl<S> DynObservable<S::Item, S::Err> for S
where
  S: Observable,
  S::Item: 'static,
  S::Err: 'static,
{
  fn dyn_subscribe(
    self: Box<Self>,
    observer: BoxedObserver<S::Item, S::Err>,
  ) -> SharedSubscription {
    (*self).actual_subscribe(observer)
  }
}

/// An observable whose concrete type is erased. Created by
/// [`ObservableExt::box_it`](crate::observable::ObservableExt::box_it).
///
/// ```
/// use rxcore::prelude::*;
///
/// let sources: Vec<BoxedObservable<i32, RxError>> = vec![
///   observable::create(|mut o: BoxedObserver<i32, RxError>| {
///     o.next(1);
///     o.complete();
///   })
///   .box_it(),
///   observable::throw_err(RxError::msg("boom")).box_it(),
/// ];
/// assert_eq!(sources.len(), 2);
/// ```
pub struct BoxedObservable<Item, Err>(Box<dyn DynObservable<Item, Err> + Send>);

impl<Item, Err> BoxedObservable<Item, Err> {
  pub fn new<S>(source: S) -> Self
  where
    S: Observable<Item = Item, Err = Err> + Send + 'static,
    Item: 'static,
    Err: 'static,
  {
    BoxedObservable(Box::new(source))
  }
}

impl<Item: 'static, Err: 'static> Observable for BoxedObservable<Item, Err> {
  type Item = Item;
  type Err = Err;

  #[inline]
  fn actual_subscribe<O>(self, observer: O) -> SharedSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    self.0.dyn_subscribe(Box::new(observer))
  }
}
