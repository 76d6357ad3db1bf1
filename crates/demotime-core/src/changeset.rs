//! The unit of work produced by a transition.
//!
//! The engine never writes to the store directly. It records every durable
//! side effect of an operation as a [`Mutation`] and hands the whole
//! [`Changeset`] to [`ReviewStore::apply`](crate::store::ReviewStore::apply),
//! which must apply it atomically: either every mutation commits or none does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  comment::{Comment, Issue},
  event::Event,
  message::NewMessage,
  reminder::Reminder,
  review::{Creator, Follower, Review, Reviewer, Revision},
  state::{DemoState, ReviewerState},
};

/// Which read-status rows a fan-out marks unread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "user_id", rename_all = "snake_case")]
pub enum ReadScope {
  /// Every row of the review except this user's.
  AllExcept(Uuid),
  /// Only this user's row.
  Only(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
  // ── Review ──────────────────────────────────────────────────────────────
  InsertReview(Review),
  UpdateReviewDetails {
    review_id:   Uuid,
    title:       String,
    description: String,
    case_link:   String,
    at:          DateTime<Utc>,
  },
  /// Compare-and-set: applies only if the stored state is still `from`.
  SetDemoState {
    review_id: Uuid,
    from:      DemoState,
    to:        DemoState,
    at:        DateTime<Utc>,
  },
  /// Compare-and-set: applies only if the stored state is still `from`.
  SetReviewerState {
    review_id: Uuid,
    from:      ReviewerState,
    to:        ReviewerState,
    at:        DateTime<Utc>,
  },
  InsertRevision(Revision),

  // ── Participants ────────────────────────────────────────────────────────
  /// Insert, or reactivate the existing (review, user) row with the given
  /// status.
  UpsertReviewer(Reviewer),
  SetReviewerStatus {
    review_id: Uuid,
    user_id:   Uuid,
    status:    ReviewerState,
    at:        DateTime<Utc>,
  },
  ResetReviewerVotes {
    review_id: Uuid,
    at:        DateTime<Utc>,
  },
  /// Deactivates the row and resets its vote to `reviewing`.
  DeactivateReviewer {
    review_id: Uuid,
    user_id:   Uuid,
    at:        DateTime<Utc>,
  },
  StampReviewerViewed {
    review_id: Uuid,
    user_id:   Uuid,
    at:        DateTime<Utc>,
  },
  UpsertFollower(Follower),
  DeactivateFollower {
    review_id: Uuid,
    user_id:   Uuid,
    at:        DateTime<Utc>,
  },
  UpsertCreator(Creator),
  DeactivateCreator {
    review_id: Uuid,
    user_id:   Uuid,
    at:        DateTime<Utc>,
  },
  /// Bump `modified_at` on every active reviewer and follower row.
  TouchParticipants {
    review_id: Uuid,
    at:        DateTime<Utc>,
  },

  // ── Read status ─────────────────────────────────────────────────────────
  /// Get-or-create the row, then set `read`.
  SetReadStatus {
    review_id: Uuid,
    user_id:   Uuid,
    read:      bool,
    at:        DateTime<Utc>,
  },
  /// Create an unread row if none exists; leave an existing row untouched.
  EnsureReadStatus {
    review_id: Uuid,
    user_id:   Uuid,
    at:        DateTime<Utc>,
  },
  MarkUnread {
    review_id: Uuid,
    scope:     ReadScope,
    at:        DateTime<Utc>,
  },

  // ── Messages ────────────────────────────────────────────────────────────
  /// Get-or-create the (review, recipient) bundle, reset its `read` and
  /// `deleted` flags, and append the message.
  AppendMessage(NewMessage),

  // ── Reminders ───────────────────────────────────────────────────────────
  /// Insert unless a row already exists for (review, user).
  EnsureReminder(Reminder),
  /// Flip `active` on one user's reminder, or on every reminder of the review
  /// when `user_id` is `None`. `remind_at` is rewritten when given.
  SetReminderActive {
    review_id: Uuid,
    user_id:   Option<Uuid>,
    active:    bool,
    remind_at: Option<DateTime<Utc>>,
    at:        DateTime<Utc>,
  },
  /// Compare-and-set on `remind_at`: applies only if it still equals
  /// `expected`.
  RescheduleReminder {
    reminder_id: Uuid,
    expected:    DateTime<Utc>,
    remind_at:   DateTime<Utc>,
    at:          DateTime<Utc>,
  },
  DeleteReminder {
    review_id: Uuid,
    user_id:   Uuid,
  },

  // ── Log, comments, issues ───────────────────────────────────────────────
  InsertEvent(Event),
  InsertComment(Comment),
  InsertIssue(Issue),
  ResolveIssue {
    issue_id:    Uuid,
    resolved_by: Uuid,
    at:          DateTime<Utc>,
  },
}

/// An ordered list of mutations applied as one transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Changeset {
  mutations: Vec<Mutation>,
}

impl Changeset {
  pub fn new() -> Self { Self::default() }

  pub fn push(&mut self, mutation: Mutation) { self.mutations.push(mutation); }

  pub fn is_empty(&self) -> bool { self.mutations.is_empty() }

  pub fn len(&self) -> usize { self.mutations.len() }

  pub fn iter(&self) -> std::slice::Iter<'_, Mutation> { self.mutations.iter() }

  pub fn events(&self) -> impl Iterator<Item = &Event> {
    self.mutations.iter().filter_map(|m| match m {
      Mutation::InsertEvent(e) => Some(e),
      _ => None,
    })
  }

  pub fn messages(&self) -> impl Iterator<Item = &NewMessage> {
    self.mutations.iter().filter_map(|m| match m {
      Mutation::AppendMessage(msg) => Some(msg),
      _ => None,
    })
  }
}

impl IntoIterator for Changeset {
  type IntoIter = std::vec::IntoIter<Mutation>;
  type Item = Mutation;

  fn into_iter(self) -> Self::IntoIter { self.mutations.into_iter() }
}

impl<'a> IntoIterator for &'a Changeset {
  type IntoIter = std::slice::Iter<'a, Mutation>;
  type Item = &'a Mutation;

  fn into_iter(self) -> Self::IntoIter { self.mutations.iter() }
}

/// Result of applying a changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
  Committed,
  /// A compare-and-set guard failed; nothing was written.
  Conflict,
}
