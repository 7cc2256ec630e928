//! Error types carried on the `error` channel.
//!
//! Any type can be an observable's `Err`. [`RxError`] is the ready-made one,
//! and [`FromComposite`] is the hook `merge_delay_error` needs to fold several
//! buffered failures into one terminal error.

use thiserror::Error;

/// General purpose stream error.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RxError {
  /// A failure described by a message.
  #[error("{0}")]
  Message(String),

  /// Several failures collected by a delay-error combinator.
  #[error(transparent)]
  Composite(#[from] CompositeError),
}

impl RxError {
  pub fn msg(msg: impl Into<String>) -> Self { RxError::Message(msg.into()) }
}

/// Every error buffered by a delay-error combinator, in arrival order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} errors occurred", .errors.len())]
pub struct CompositeError {
  errors: Vec<RxError>,
}

impl CompositeError {
  pub fn new(errors: Vec<RxError>) -> Self { CompositeError { errors } }

  pub fn errors(&self) -> &[RxError] { &self.errors }

  pub fn len(&self) -> usize { self.errors.len() }

  pub fn is_empty(&self) -> bool { self.errors.is_empty() }

  pub fn into_errors(self) -> Vec<RxError> { self.errors }
}

/// Folds more than one error into a single terminal error.
///
/// `merge_delay_error` calls this only with two or more errors; a single
/// buffered error is forwarded as is.
pub trait FromComposite: Sized {
  fn from_errors(errors: Vec<Self>) -> Self;
}

impl FromComposite for RxError {
  fn from_errors(errors: Vec<Self>) -> Self { RxError::Composite(CompositeError::new(errors)) }
}

impl FromComposite for String {
  fn from_errors(errors: Vec<Self>) -> Self { errors.join("; ") }
}

impl FromComposite for () {
  fn from_errors(_: Vec<Self>) -> Self {}
}
