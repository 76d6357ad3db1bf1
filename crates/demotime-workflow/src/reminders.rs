//! ReminderScheduler: one recurring reminder per (review, user).
//!
//! Rows are created with get-or-create semantics, so scheduling twice never
//! yields a second reminder. Firing is driven by the poller through
//! [`Workflow::fire_due_reminders`](crate::Workflow::fire_due_reminders).

use demotime_core::{
  changeset::Mutation,
  reminder::{Reminder, ReminderKind},
};
use uuid::Uuid;

use crate::unit::Unit;

/// Ensure a reminder for `user`, due `days` business days from now.
pub(crate) fn ensure(unit: &mut Unit<'_>, user_id: Uuid, kind: ReminderKind, active: bool) {
  let mut reminder =
    Reminder::new(unit.review_id(), user_id, kind, unit.due_at(), unit.now);
  reminder.active = active;
  unit.push(Mutation::EnsureReminder(reminder));
}

/// One `creator` reminder per active creator and one `reviewer` reminder per
/// active reviewer. Existing rows are left untouched.
pub(crate) fn schedule_for_review(unit: &mut Unit<'_>) {
  let creators = unit.snap.creator_ids();
  let reviewers: Vec<Uuid> = unit.snap.active_reviewers().map(|r| r.user_id).collect();
  for user_id in creators {
    ensure(unit, user_id, ReminderKind::Creator, true);
  }
  for user_id in reviewers {
    ensure(unit, user_id, ReminderKind::Reviewer, true);
  }
}

/// Flip one user's reminder. Reactivation pushes `remind_at` to a fresh due
/// date.
pub(crate) fn set_active(unit: &mut Unit<'_>, user_id: Uuid, active: bool) {
  let remind_at = active.then(|| unit.due_at());
  unit.push(Mutation::SetReminderActive {
    review_id: unit.review_id(),
    user_id: Some(user_id),
    active,
    remind_at,
    at: unit.now,
  });
}

/// Flip every reminder on the review.
pub(crate) fn set_active_for_review(unit: &mut Unit<'_>, active: bool) {
  let remind_at = active.then(|| unit.due_at());
  unit.push(Mutation::SetReminderActive {
    review_id: unit.review_id(),
    user_id: None,
    active,
    remind_at,
    at: unit.now,
  });
}

pub(crate) fn remove(unit: &mut Unit<'_>, user_id: Uuid) {
  unit.push(Mutation::DeleteReminder { review_id: unit.review_id(), user_id });
}
