use crate::{
  observer::Observer,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// Implements the Observer trait on top of a subscription. While the Observer
/// is the public API for consuming the values of an Observable, all Observers
/// get converted to a Subscriber, in order to provide Subscription
/// capabilities.
///
/// The subscriber enforces the observer contract: at most one of `error` /
/// `complete` reaches the wrapped observer, and nothing reaches it after that
/// or after the subscription was closed from outside. The terminal
/// notification and the cancellation of everything registered on the
/// subscription happen as one step, won by a single compare-and-set.
pub struct Subscriber<O> {
  observer: Option<O>,
  subscription: SharedSubscription,
}

impl<O> Subscriber<O> {
  pub fn new(observer: O, subscription: SharedSubscription) -> Self {
    Subscriber { observer: Some(observer), subscription }
  }

  /// The subscription this subscriber closes on termination.
  #[inline]
  pub fn subscription(&self) -> &SharedSubscription { &self.subscription }
}

impl<Item, Err, O> Observer<Item, Err> for Subscriber<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    match self.observer.as_mut() {
      Some(observer) if self.subscription.is_active() => observer.next(value),
      _ => tracing::trace!("next after termination dropped"),
    }
  }

  fn error(&mut self, err: Err) {
    let observer = &mut self.observer;
    let delivered = self.subscription.close_with(move || {
      if let Some(mut observer) = observer.take() {
        observer.error(err);
      }
    });
    if delivered.is_none() {
      tracing::trace!("error after termination dropped");
    }
  }

  fn complete(&mut self) {
    let observer = &mut self.observer;
    let delivered = self.subscription.close_with(move || {
      if let Some(mut observer) = observer.take() {
        observer.complete();
      }
    });
    if delivered.is_none() {
      tracing::trace!("complete after termination dropped");
    }
  }

  fn is_finished(&self) -> bool {
    self.subscription.is_closed() || self.observer.as_ref().is_none_or(Observer::is_finished)
  }
}

impl<O> SubscriptionLike for Subscriber<O> {
  #[inline]
  fn unsubscribe(&mut self) { self.subscription.unsubscribe(); }

  #[inline]
  fn is_closed(&self) -> bool { self.subscription.is_closed() }
}
