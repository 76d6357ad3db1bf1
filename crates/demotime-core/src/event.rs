//! The append-only event log.
//!
//! Every event is tied to a related entity (the review itself, a revision, a
//! reviewer row, ...). The entity's review is resolved through the [`Related`]
//! trait so an event always records both the related id and the review id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  Error,
  Result,
  comment::{Comment, Issue},
  review::{Creator, Follower, Review, Reviewer, Revision},
};

// ─── Codes ───────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EventCode {
  DemoCreated,
  DemoOpened,
  DemoPaused,
  DemoClosed,
  DemoAborted,
  DemoApproved,
  DemoRejected,
  DemoReviewing,
  RevisionAdded,
  CommentAdded,
  ReviewerAdded,
  ReviewerRemoved,
  ReviewerApproved,
  ReviewerRejected,
  ReviewerReset,
  FollowerAdded,
  FollowerRemoved,
  OwnerAdded,
  OwnerRemoved,
  IssueCreated,
  IssueResolved,
}

impl EventCode {
  pub fn code(self) -> &'static str { self.into() }

  pub fn from_code(code: &str) -> Result<Self> {
    code
      .parse()
      .map_err(|_| Error::UnknownEventCode(code.to_owned()))
  }
}

/// The kind of entity an event refers to.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RelatedType {
  Review,
  Revision,
  Reviewer,
  Follower,
  Creator,
  Comment,
  Issue,
}

impl RelatedType {
  pub fn name(self) -> &'static str { self.into() }

  pub fn from_name(name: &str) -> Result<Self> {
    name
      .parse()
      .map_err(|_| Error::UnknownRelatedType(name.to_owned()))
  }
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// An entity an event can be attached to.
pub trait Related {
  fn related_type(&self) -> RelatedType;
  fn related_id(&self) -> Uuid;
  /// The review this entity belongs to.
  fn review_id(&self) -> Uuid;
}

macro_rules! related {
  ($ty:ty, $kind:ident, $id:ident) => {
    impl Related for $ty {
      fn related_type(&self) -> RelatedType { RelatedType::$kind }

      fn related_id(&self) -> Uuid { self.$id }

      fn review_id(&self) -> Uuid { self.review_id }
    }
  };
}

related!(Review, Review, review_id);
related!(Revision, Revision, revision_id);
related!(Reviewer, Reviewer, reviewer_id);
related!(Follower, Follower, follower_id);
related!(Creator, Creator, creator_id);
related!(Comment, Comment, comment_id);
related!(Issue, Issue, issue_id);

// ─── Event ───────────────────────────────────────────────────────────────────

/// An append-only log row. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub event_id:     Uuid,
  pub project_id:   Uuid,
  pub review_id:    Uuid,
  pub code:         EventCode,
  pub related_type: RelatedType,
  pub related_id:   Uuid,
  /// The user that performed the action.
  pub user_id:      Uuid,
  pub created_at:   DateTime<Utc>,
}

impl Event {
  pub fn new(
    project_id: Uuid,
    code: EventCode,
    related: &impl Related,
    user_id: Uuid,
    at: DateTime<Utc>,
  ) -> Self {
    Self {
      event_id: Uuid::new_v4(),
      project_id,
      review_id: related.review_id(),
      code,
      related_type: related.related_type(),
      related_id: related.related_id(),
      user_id,
      created_at: at,
    }
  }
}
