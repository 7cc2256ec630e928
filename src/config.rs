//! Runtime configuration for the pooled scheduler.
//!
//! Compile-time switches are Cargo features (`pooled-scheduler`, on by
//! default). The only runtime knobs are the ones a dedicated worker pool
//! needs.
//!
//! # Example
//! ```
//! use rxcore::config::PoolConfig;
//!
//! let mut cfg = PoolConfig::default();
//! cfg.worker_threads = 2;
//! cfg.thread_name = "my-pool".into();
//!
//! assert_eq!(cfg.worker_threads, 2);
//! ```

use std::{num::NonZeroUsize, thread};

/// Settings for a dedicated worker pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
  /// Number of worker threads (0 is treated as 1).
  pub worker_threads: usize,
  /// Name given to every worker thread.
  pub thread_name: String,
}

impl Default for PoolConfig {
  /// - `worker_threads` = available parallelism, or 1 when unknown
  /// - `thread_name = "rxcore-pool"`
  fn default() -> Self {
    Self {
      worker_threads: thread::available_parallelism().map_or(1, NonZeroUsize::get),
      thread_name: "rxcore-pool".to_owned(),
    }
  }
}

impl PoolConfig {
  pub(crate) fn effective_workers(&self) -> usize { self.worker_threads.max(1) }
}
