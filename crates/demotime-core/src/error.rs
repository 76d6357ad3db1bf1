//! Error types for `demotime-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown demo state: {0:?}")]
  UnknownDemoState(String),

  #[error("unknown reviewer state: {0:?}")]
  UnknownReviewerState(String),

  #[error("unknown event code: {0:?}")]
  UnknownEventCode(String),

  #[error("unknown related entity type: {0:?}")]
  UnknownRelatedType(String),

  #[error("unknown webhook trigger: {0:?}")]
  UnknownTrigger(String),

  #[error("unknown reminder kind: {0:?}")]
  UnknownReminderKind(String),

  #[error("unknown message template: {0:?}")]
  UnknownTemplate(String),

  #[error("unknown setting type: {0:?}")]
  UnknownSettingType(String),

  #[error("setting {key:?} has an invalid value: {reason}")]
  InvalidSetting { key: String, reason: String },

  #[error("outbound queue is closed")]
  QueueClosed,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
