//! Error type for `demotime-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] demotime_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A review row exists but its project or first revision is missing.
  #[error("review {0} is incomplete: {1}")]
  IncompleteReview(uuid::Uuid, &'static str),

  #[error("username already taken: {0:?}")]
  UsernameTaken(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
