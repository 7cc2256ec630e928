use crate::{observable::Observable, observer::Observer, subscription::SharedSubscription};

#[derive(Clone)]
pub struct MapErrOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: F,
}

impl<S, F, OutErr> Observable for MapErrOp<S, F>
where
  S: Observable,
  F: FnOnce(S::Err) -> OutErr + Send + 'static,
{
  type Item = S::Item;
  type Err = OutErr;

  fn actual_subscribe<O>(self, observer: O) -> SharedSubscription
  where
    O: Observer<Self::Item, OutErr> + Send + 'static,
  {
    let MapErrOp { source, func } = self;
    source.actual_subscribe(MapErrObserver { observer, func: Some(func) })
  }
}

pub struct MapErrObserver<O, F> {
  observer: O,
  func: Option<F>,
}

impl<O, F, Item, Err, OutErr> Observer<Item, Err> for MapErrObserver<O, F>
where
  O: Observer<Item, OutErr>,
  F: FnOnce(Err) -> OutErr,
{
  #[inline]
  fn next(&mut self, value: Item) { self.observer.next(value); }

  fn error(&mut self, err: Err) {
    if let Some(func) = self.func.take() {
      self.observer.error(func(err));
    }
  }

  #[inline]
  fn complete(&mut self) { self.observer.complete(); }

  #[inline]
  fn is_finished(&self) -> bool { self.func.is_none() || self.observer.is_finished() }
}
