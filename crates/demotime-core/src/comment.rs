//! Comments on a revision and the issues raised against them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A comment posted on a specific revision. Comments sharing a `thread_id`
/// form a discussion thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id:   Uuid,
  pub review_id:    Uuid,
  pub revision_id:  Uuid,
  pub thread_id:    Uuid,
  pub commenter_id: Uuid,
  pub body:         String,
  pub created_at:   DateTime<Utc>,
}

/// A blocking issue raised from a comment. At most one unresolved issue may
/// exist per (review, comment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
  pub issue_id:    Uuid,
  pub review_id:   Uuid,
  pub comment_id:  Uuid,
  pub created_by:  Uuid,
  pub resolved_by: Option<Uuid>,
  pub created_at:  DateTime<Utc>,
  pub modified_at: DateTime<Utc>,
}

impl Issue {
  pub fn is_resolved(&self) -> bool { self.resolved_by.is_some() }
}
