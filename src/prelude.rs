//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

pub use std::time::Duration;

pub use crate::{
  config::PoolConfig,
  error::{CompositeError, FromComposite, RxError},
  observable::{self, BoxedObservable, Observable, ObservableExt},
  observer::{BoxedObserver, Observer, ObserverAll},
  scheduler::{ImmediateScheduler, Scheduler, VirtualTimeScheduler},
  subject::Subject,
  subscriber::Subscriber,
  subscription::{
    ClosureSubscription, SharedSubscription, SubscriptionGuard, SubscriptionLike,
    SubscriptionWrapper,
  },
};
#[cfg(feature = "pooled-scheduler")]
pub use crate::scheduler::PooledScheduler;
