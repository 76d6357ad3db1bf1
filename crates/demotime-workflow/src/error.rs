//! Error type for `demotime-workflow`.

use demotime_core::state::DemoState;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// A transition was requested to a state name that does not exist.
  #[error("unknown demo state: {0:?}")]
  InvalidState(String),

  #[error("cannot move a review from {from} to {to}")]
  InvalidTransition { from: DemoState, to: DemoState },

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("review not found: {0}")]
  ReviewNotFound(Uuid),

  #[error("user {user_id} is not an active reviewer of review {review_id}")]
  ReviewerNotFound { review_id: Uuid, user_id: Uuid },

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("project not found: {0}")]
  ProjectNotFound(Uuid),

  #[error("comment not found: {0}")]
  CommentNotFound(Uuid),

  #[error("issue not found: {0}")]
  IssueNotFound(Uuid),

  #[error("message bundle not found: {0}")]
  BundleNotFound(Uuid),

  #[error("user {user_id} may not {action}")]
  PermissionDenied { user_id: Uuid, action: &'static str },

  /// Only raised when strict delivery is configured. The transition that
  /// produced the job has already been committed.
  #[error("outbound delivery failed: {0}")]
  Delivery(String),

  #[error("review {0} was modified concurrently")]
  ConcurrentModification(Uuid),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
