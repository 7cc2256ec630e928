use std::{io, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::{
  future::{AbortHandle, Abortable},
  FutureExt,
};
use once_cell::sync::Lazy;
use tokio::runtime::{Builder, Handle, Runtime};

use super::{wall_clock, Scheduler};
use crate::{
  config::PoolConfig,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// Process-wide pool used by `PooledScheduler::default()`.
static DEFAULT_POOL: Lazy<PooledScheduler> = Lazy::new(|| {
  PooledScheduler::new(&PoolConfig::default()).expect("failed to start the default rxcore pool")
});

/// Cancels a spawned task when unsubscribed.
#[derive(Clone, Debug)]
pub struct SpawnHandle(pub(crate) AbortHandle);

impl SpawnHandle {
  #[inline]
  pub fn new(handle: AbortHandle) -> Self { SpawnHandle(handle) }
}

impl SubscriptionLike for SpawnHandle {
  #[inline]
  fn unsubscribe(&mut self) { self.0.abort() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_aborted() }
}

/// Owns a dedicated runtime and shuts it down without blocking, so the last
/// scheduler clone may be dropped from inside an async context.
struct PoolRuntime(Option<Runtime>);

impl Drop for PoolRuntime {
  fn drop(&mut self) {
    if let Some(rt) = self.0.take() {
      rt.shutdown_background();
    }
  }
}

/// Runs work on a tokio multi-thread worker pool.
///
/// Delays use tokio's timer. Unsubscribing before the work starts prevents
/// it from running; unsubscribing while it runs or afterwards is a no-op. A
/// panicking task is caught on the worker and logged with `tracing::error!`.
#[derive(Clone)]
pub struct PooledScheduler {
  handle: Handle,
  _runtime: Option<Arc<PoolRuntime>>,
}

impl PooledScheduler {
  /// Start a dedicated pool configured by `config`.
  pub fn new(config: &PoolConfig) -> io::Result<Self> {
    let runtime = Builder::new_multi_thread()
      .worker_threads(config.effective_workers())
      .thread_name(config.thread_name.clone())
      .enable_time()
      .build()?;
    tracing::debug!(
      workers = config.effective_workers(),
      name = %config.thread_name,
      "pooled scheduler started"
    );
    Ok(PooledScheduler {
      handle: runtime.handle().clone(),
      _runtime: Some(Arc::new(PoolRuntime(Some(runtime)))),
    })
  }

  /// Schedule onto a runtime owned by someone else.
  pub fn from_handle(handle: Handle) -> Self { PooledScheduler { handle, _runtime: None } }

  /// Schedule onto the runtime the caller is currently running in.
  ///
  /// # Panics
  /// If called outside of a tokio runtime.
  pub fn current() -> Self { Self::from_handle(Handle::current()) }
}

/// Shares one process-wide pool, started with [`PoolConfig::default`] on
/// first use.
///
/// # Panics
/// If that pool's runtime cannot be built. Use [`PooledScheduler::new`] to
/// handle the error instead.
impl Default for PooledScheduler {
  fn default() -> Self { DEFAULT_POOL.clone() }
}

impl std::fmt::Debug for PooledScheduler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PooledScheduler")
      .field("owns_runtime", &self._runtime.is_some())
      .finish()
  }
}

impl Scheduler for PooledScheduler {
  fn now(&self) -> Duration { wall_clock() }

  fn schedule<S, F>(&self, task: F, delay: Option<Duration>, state: S) -> SharedSubscription
  where
    S: Send + 'static,
    F: FnOnce(S) + Send + 'static,
  {
    let subscription = SharedSubscription::default();
    let (abort, registration) = AbortHandle::new_pair();
    subscription.add(SpawnHandle::new(abort));

    let mut c_subscription = subscription.clone();
    let fut = async move {
      if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
      }
      if !c_subscription.is_closed() {
        let res = AssertUnwindSafe(async move { task(state) }).catch_unwind().await;
        if res.is_err() {
          tracing::error!("task panicked on pooled scheduler worker");
        }
      }
      c_subscription.unsubscribe();
    };
    self.handle.spawn(Abortable::new(fut, registration));
    subscription
  }
}
