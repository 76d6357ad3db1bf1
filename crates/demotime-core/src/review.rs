//! The review aggregate and its owned collections.
//!
//! A review is loaded as a [`ReviewSnapshot`]: the review row plus every
//! participant row, the latest revision, the project, the project's webhooks,
//! and the user records of everyone involved. The workflow engine works on a
//! snapshot in memory and expresses its writes as a
//! [`Changeset`](crate::changeset::Changeset).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
  state::{DemoState, ReviewerState},
  user::{Project, User},
  webhook::WebHook,
};

// ─── Review ──────────────────────────────────────────────────────────────────

/// The central aggregate. `demo_state` and `reviewer_state` evolve
/// independently; `reviewer_state` is preserved across pause/close so that a
/// reopen can decide whether to recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
  pub review_id:      Uuid,
  pub project_id:     Uuid,
  pub title:          String,
  pub description:    String,
  pub case_link:      String,
  pub demo_state:     DemoState,
  pub reviewer_state: ReviewerState,
  pub is_public:      bool,
  pub created_at:     DateTime<Utc>,
  pub modified_at:    DateTime<Utc>,
}

/// Immutable snapshot of the review body. Numbers start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
  pub revision_id: Uuid,
  pub review_id:   Uuid,
  pub number:      u32,
  pub description: String,
  pub created_at:  DateTime<Utc>,
}

// ─── Participants ────────────────────────────────────────────────────────────

/// A voting participant. Exactly one row per (review, user); dropping a
/// reviewer deactivates the row rather than deleting it so events can still
/// refer to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
  pub reviewer_id: Uuid,
  pub review_id:   Uuid,
  pub user_id:     Uuid,
  pub status:      ReviewerState,
  pub is_active:   bool,
  pub last_viewed: Option<DateTime<Utc>>,
  pub created_at:  DateTime<Utc>,
  pub modified_at: DateTime<Utc>,
}

impl Reviewer {
  pub fn new(review_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> Self {
    Self {
      reviewer_id: Uuid::new_v4(),
      review_id,
      user_id,
      status: ReviewerState::Reviewing,
      is_active: true,
      last_viewed: None,
      created_at: at,
      modified_at: at,
    }
  }
}

/// A non-voting observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follower {
  pub follower_id: Uuid,
  pub review_id:   Uuid,
  pub user_id:     Uuid,
  pub is_active:   bool,
  pub created_at:  DateTime<Utc>,
  pub modified_at: DateTime<Utc>,
}

impl Follower {
  pub fn new(review_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> Self {
    Self {
      follower_id: Uuid::new_v4(),
      review_id,
      user_id,
      is_active: true,
      created_at: at,
      modified_at: at,
    }
  }
}

/// An owner of the demo. A review has one or two active creators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
  pub creator_id:  Uuid,
  pub review_id:   Uuid,
  pub user_id:     Uuid,
  pub is_active:   bool,
  pub created_at:  DateTime<Utc>,
  pub modified_at: DateTime<Utc>,
}

impl Creator {
  /// Upper bound on simultaneously active creators.
  pub const MAX_ACTIVE: usize = 2;

  pub fn new(review_id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> Self {
    Self {
      creator_id: Uuid::new_v4(),
      review_id,
      user_id,
      is_active: true,
      created_at: at,
      modified_at: at,
    }
  }
}

/// Per-user read flag for a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReviewStatus {
  pub review_id:   Uuid,
  pub user_id:     Uuid,
  pub read:        bool,
  pub modified_at: DateTime<Utc>,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Everything the engine needs to run one transition for a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSnapshot {
  pub review:    Review,
  pub project:   Project,
  /// The latest revision (the one with `is_max_revision`).
  pub revision:  Revision,
  /// All reviewer rows, including inactive ones.
  pub reviewers: Vec<Reviewer>,
  pub followers: Vec<Follower>,
  pub creators:  Vec<Creator>,
  /// Webhooks registered on the review's project.
  pub webhooks:  Vec<WebHook>,
  /// User records for every participant, keyed by user id.
  pub users:     BTreeMap<Uuid, User>,
}

impl ReviewSnapshot {
  pub fn review_id(&self) -> Uuid { self.review.review_id }

  pub fn active_reviewers(&self) -> impl Iterator<Item = &Reviewer> {
    self.reviewers.iter().filter(|r| r.is_active)
  }

  pub fn active_followers(&self) -> impl Iterator<Item = &Follower> {
    self.followers.iter().filter(|f| f.is_active)
  }

  pub fn active_creators(&self) -> impl Iterator<Item = &Creator> {
    self.creators.iter().filter(|c| c.is_active)
  }

  pub fn creator_ids(&self) -> Vec<Uuid> {
    self.active_creators().map(|c| c.user_id).collect()
  }

  pub fn is_creator(&self, user_id: Uuid) -> bool {
    self.active_creators().any(|c| c.user_id == user_id)
  }

  pub fn is_reviewer(&self, user_id: Uuid) -> bool {
    self.active_reviewers().any(|r| r.user_id == user_id)
  }

  pub fn is_follower(&self, user_id: Uuid) -> bool {
    self.active_followers().any(|f| f.user_id == user_id)
  }

  /// The row for `user_id`, active or not.
  pub fn reviewer(&self, user_id: Uuid) -> Option<&Reviewer> {
    self.reviewers.iter().find(|r| r.user_id == user_id)
  }

  pub fn reviewer_mut(&mut self, user_id: Uuid) -> Option<&mut Reviewer> {
    self.reviewers.iter_mut().find(|r| r.user_id == user_id)
  }

  pub fn follower(&self, user_id: Uuid) -> Option<&Follower> {
    self.followers.iter().find(|f| f.user_id == user_id)
  }

  pub fn follower_mut(&mut self, user_id: Uuid) -> Option<&mut Follower> {
    self.followers.iter_mut().find(|f| f.user_id == user_id)
  }

  pub fn creator(&self, user_id: Uuid) -> Option<&Creator> {
    self.creators.iter().find(|c| c.user_id == user_id)
  }

  pub fn creator_mut(&mut self, user_id: Uuid) -> Option<&mut Creator> {
    self.creators.iter_mut().find(|c| c.user_id == user_id)
  }

  /// Active reviewers and followers, de-duplicated, reviewers first. These are
  /// the recipients of demo-state notifications.
  pub fn audience(&self) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::new();
    let ids = self
      .active_reviewers()
      .map(|r| r.user_id)
      .chain(self.active_followers().map(|f| f.user_id));
    for id in ids {
      if !out.contains(&id) {
        out.push(id);
      }
    }
    out
  }

  /// Every active participant: reviewers, followers, and creators.
  pub fn participants(&self) -> Vec<Uuid> {
    let mut out = self.audience();
    for id in self.creator_ids() {
      if !out.contains(&id) {
        out.push(id);
      }
    }
    out
  }

  pub fn user(&self, user_id: Uuid) -> Option<&User> { self.users.get(&user_id) }

  /// Display name for a user, falling back to the id when the record is
  /// missing from the snapshot.
  pub fn user_name(&self, user_id: Uuid) -> String {
    self
      .user(user_id)
      .map(|u| u.name().to_owned())
      .unwrap_or_else(|| user_id.to_string())
  }

  pub fn is_max_revision(&self, revision: &Revision) -> bool {
    revision.review_id == self.review.review_id
      && revision.number >= self.revision.number
  }

  /// The `review` object embedded in webhook payloads.
  pub fn to_json(&self) -> serde_json::Value {
    let reviewers: Vec<_> = self
      .active_reviewers()
      .map(|r| {
        json!({
          "user_id": r.user_id,
          "reviewer_id": r.reviewer_id,
          "status": r.status,
        })
      })
      .collect();
    let followers: Vec<_> =
      self.active_followers().map(|f| f.user_id).collect();

    json!({
      "review_id": self.review.review_id,
      "project_id": self.review.project_id,
      "title": self.review.title,
      "description": self.review.description,
      "case_link": self.review.case_link,
      "demo_state": self.review.demo_state,
      "reviewer_state": self.review.reviewer_state,
      "is_public": self.review.is_public,
      "revision": self.revision.number,
      "creators": self.creator_ids(),
      "reviewers": reviewers,
      "followers": followers,
      "created_at": self.review.created_at,
      "modified_at": self.review.modified_at,
    })
  }
}

#[cfg(test)]
pub(crate) mod fixtures {
  use super::*;

  /// A minimal open review with one creator and no other participants.
  pub fn snapshot() -> ReviewSnapshot {
    let now = Utc::now();
    let review_id = Uuid::new_v4();
    let project_id = Uuid::new_v4();
    let creator = User {
      user_id:      Uuid::new_v4(),
      username:     "owner".into(),
      display_name: None,
      email:        None,
      created_at:   now,
    };
    ReviewSnapshot {
      review:    Review {
        review_id,
        project_id,
        title: "Widget".into(),
        description: "first cut".into(),
        case_link: String::new(),
        demo_state: DemoState::Open,
        reviewer_state: ReviewerState::Reviewing,
        is_public: false,
        created_at: now,
        modified_at: now,
      },
      project:   Project {
        project_id,
        name: "Widgets".into(),
        token: "tok".into(),
        created_at: now,
      },
      revision:  Revision {
        revision_id: Uuid::new_v4(),
        review_id,
        number: 1,
        description: "first cut".into(),
        created_at: now,
      },
      reviewers: vec![],
      followers: vec![],
      creators:  vec![Creator::new(review_id, creator.user_id, now)],
      webhooks:  vec![],
      users:     BTreeMap::from([(creator.user_id, creator)]),
    }
  }
}
