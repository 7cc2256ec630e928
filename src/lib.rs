//! # rxcore: a push-based reactive engine
//!
//! Producers push values to observers through a small set of contracts:
//! [`Observable`], [`Observer`] and cancellable subscriptions. Time is
//! abstracted behind a [`Scheduler`], so every timed operator can be driven
//! by a worker pool in production or by a virtual clock in tests.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxcore::prelude::*;
//!
//! observable::from_iter(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .take_while(|v| *v < 6)
//!   .subscribe(|v| println!("Value: {}", v));
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | A recipe for a stream and the operator surface |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` events |
//! | [`Subscriber`] | Guards an observer so it sees at most one terminal event |
//! | [`SharedSubscription`] | Handle to cancel an active subscription |
//! | [`Scheduler`] | Runs tasks now, later, or periodically |
//!
//! ## Feature Flags
//!
//! - **`pooled-scheduler`** (default): the tokio backed [`PooledScheduler`].
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Subscriber`]: subscriber::Subscriber
//! [`SharedSubscription`]: subscription::SharedSubscription
//! [`Scheduler`]: scheduler::Scheduler
//! [`PooledScheduler`]: scheduler::PooledScheduler

pub mod config;
pub mod error;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;
pub mod subject;
pub mod subscriber;
pub mod subscription;

pub use prelude::*;
