//! In-app messages and the per-recipient bundles that group them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

/// Which message body is rendered for a notification.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageTemplate {
  /// New review or new revision, sent to reviewers and followers.
  Review,
  Reviewer,
  ReviewerStatusChange,
  Follower,
  Creator,
  Reopened,
  Paused,
  Closed,
  Aborted,
  Approved,
  Rejected,
  Reviewing,
  Reminder,
  NewComment,
}

impl MessageTemplate {
  pub fn name(self) -> &'static str { self.into() }

  pub fn from_name(name: &str) -> Result<Self> {
    name
      .parse()
      .map_err(|_| Error::UnknownTemplate(name.to_owned()))
  }
}

/// Groups every message for one (review-or-none, owner) pair.
///
/// `read` and `deleted` are reset to `false` whenever a new message is
/// appended, so a new message revives a bundle the owner had dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBundle {
  pub bundle_id:   Uuid,
  pub review_id:   Option<Uuid>,
  pub owner_id:    Uuid,
  pub read:        bool,
  pub deleted:     bool,
  pub created_at:  DateTime<Utc>,
  pub modified_at: DateTime<Utc>,
}

/// A message as handed to the store. The bundle is resolved (get-or-create)
/// when the message is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
  pub message_id:   Uuid,
  pub recipient_id: Uuid,
  pub sender_id:    Uuid,
  /// Derived from `revision_id` when present.
  pub review_id:    Option<Uuid>,
  pub revision_id:  Option<Uuid>,
  pub thread_id:    Option<Uuid>,
  pub title:        String,
  pub template:     MessageTemplate,
  pub context:      serde_json::Value,
  pub body:         String,
  pub created_at:   DateTime<Utc>,
}

/// A persisted, immutable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
  pub message_id:   Uuid,
  pub bundle_id:    Uuid,
  pub recipient_id: Uuid,
  pub sender_id:    Uuid,
  pub review_id:    Option<Uuid>,
  pub revision_id:  Option<Uuid>,
  pub thread_id:    Option<Uuid>,
  pub title:        String,
  pub template:     MessageTemplate,
  pub context:      serde_json::Value,
  pub body:         String,
  pub created_at:   DateTime<Utc>,
}
