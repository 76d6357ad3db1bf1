//! Adding and dropping reviewers, followers, and creators.
//!
//! These helpers only touch the unit. Callers decide when to recompute the
//! consensus, since a batch of changes (a revision update) should recompute
//! once at the end.

use demotime_core::{
  changeset::Mutation,
  event::EventCode,
  message::MessageTemplate,
  reminder::ReminderKind,
  review::{Creator, Follower, Reviewer},
  state::{DemoState, ReviewerState},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
  Error,
  Result,
  demo_machine,
  events,
  notify::{self, Notice},
  reminders,
  unit::Unit,
};

fn ensure_read_status(unit: &mut Unit<'_>, user_id: Uuid) {
  unit.push(Mutation::EnsureReadStatus {
    review_id: unit.review_id(),
    user_id,
    at: unit.now,
  });
}

// ─── Reviewers ───────────────────────────────────────────────────────────────

/// Make `user_id` an active reviewer with a fresh `reviewing` vote. Returns
/// `false` if they already are one.
pub(crate) fn add_reviewer(unit: &mut Unit<'_>, user_id: Uuid) -> bool {
  if unit.snap.is_reviewer(user_id) {
    return false;
  }
  let (review_id, now) = (unit.review_id(), unit.now);
  let row = match unit.snap.reviewer_mut(user_id) {
    Some(existing) => {
      existing.is_active = true;
      existing.status = ReviewerState::Reviewing;
      existing.modified_at = now;
      existing.clone()
    }
    None => {
      let row = Reviewer::new(review_id, user_id, now);
      unit.snap.reviewers.push(row.clone());
      row
    }
  };
  unit.push(Mutation::UpsertReviewer(row.clone()));
  ensure_read_status(unit, user_id);

  if unit.is_draft() {
    return true;
  }

  events::record(unit, EventCode::ReviewerAdded, &row);
  let open = unit.snap.review.demo_state == DemoState::Open;
  reminders::ensure(unit, user_id, ReminderKind::Reviewer, open);

  let title = unit.snap.review.title.clone();
  let actor = unit.actor;
  if user_id != actor {
    let notice = Notice::new(
      user_id,
      format!("You have been added as a reviewer on: {title}"),
      MessageTemplate::Reviewer,
    )
    .with_context(json!({ "change": "added", "title": title }));
    notify::send(unit, notice);
  }
  if !unit.snap.is_creator(actor) {
    let name = unit.snap.user_name(user_id);
    let subject = format!("{name} has been added as a reviewer on: {title}");
    let context = json!({ "change": "announced", "name": name, "title": title });
    let creators = unit.snap.creator_ids();
    notify::send_all(unit, creators, |to| {
      Notice::new(to, subject.clone(), MessageTemplate::Reviewer)
        .with_context(context.clone())
    });
  }
  true
}

/// Deactivate an active reviewer: the row is kept for the event log, its vote
/// is reset, and its reminder is deleted.
pub(crate) fn drop_reviewer(unit: &mut Unit<'_>, user_id: Uuid) -> Result<()> {
  let Some(row) = unit
    .snap
    .reviewer(user_id)
    .filter(|r| r.is_active)
    .cloned()
  else {
    return Err(Error::ReviewerNotFound {
      review_id: unit.review_id(),
      user_id,
    });
  };

  if !unit.is_draft() {
    let title = unit.snap.review.title.clone();
    let notice = Notice::new(
      user_id,
      format!("Deleted as reviewer on: {title}"),
      MessageTemplate::Reviewer,
    )
    .with_context(json!({ "change": "removed", "title": title }));
    notify::send(unit, notice);
    events::record(unit, EventCode::ReviewerRemoved, &row);
  }

  unit.push(Mutation::DeactivateReviewer {
    review_id: unit.review_id(),
    user_id,
    at: unit.now,
  });
  let now = unit.now;
  if let Some(r) = unit.snap.reviewer_mut(user_id) {
    r.is_active = false;
    r.status = ReviewerState::Reviewing;
    r.modified_at = now;
  }
  reminders::remove(unit, user_id);
  Ok(())
}

// ─── Followers ───────────────────────────────────────────────────────────────

/// Returns `false` when the user already follows or reviews the demo.
pub(crate) fn add_follower(unit: &mut Unit<'_>, user_id: Uuid) -> bool {
  if unit.snap.is_reviewer(user_id) || unit.snap.is_follower(user_id) {
    return false;
  }
  let (review_id, now) = (unit.review_id(), unit.now);
  let row = match unit.snap.follower_mut(user_id) {
    Some(existing) => {
      existing.is_active = true;
      existing.modified_at = now;
      existing.clone()
    }
    None => {
      let row = Follower::new(review_id, user_id, now);
      unit.snap.followers.push(row.clone());
      row
    }
  };
  unit.push(Mutation::UpsertFollower(row.clone()));
  ensure_read_status(unit, user_id);

  if unit.is_draft() {
    return true;
  }

  events::record(unit, EventCode::FollowerAdded, &row);
  let name = unit.snap.user_name(user_id);
  let subject = format!("{name} is now following {}", unit.snap.review.title);
  let context = json!({ "name": name, "title": unit.snap.review.title });
  let creators: Vec<Uuid> = unit
    .snap
    .creator_ids()
    .into_iter()
    .filter(|c| *c != user_id)
    .collect();
  notify::send_all(unit, creators, |to| {
    Notice::new(to, subject.clone(), MessageTemplate::Follower).with_context(context.clone())
  });
  true
}

/// Returns `false` when the user was not following.
pub(crate) fn drop_follower(unit: &mut Unit<'_>, user_id: Uuid) -> bool {
  let Some(row) = unit
    .snap
    .follower(user_id)
    .filter(|f| f.is_active)
    .cloned()
  else {
    return false;
  };

  if !unit.is_draft() {
    events::record(unit, EventCode::FollowerRemoved, &row);
  }
  unit.push(Mutation::DeactivateFollower {
    review_id: unit.review_id(),
    user_id,
    at: unit.now,
  });
  let now = unit.now;
  if let Some(f) = unit.snap.follower_mut(user_id) {
    f.is_active = false;
    f.modified_at = now;
  }
  true
}

// ─── Creators ────────────────────────────────────────────────────────────────

fn owner_notice(unit: &Unit<'_>, user_id: Uuid, removed: bool) -> Notice {
  let title = &unit.snap.review.title;
  Notice::new(
    user_id,
    format!(
      "You have been {} as an owner of {title}",
      if removed { "removed" } else { "added" }
    ),
    MessageTemplate::Creator,
  )
  .with_context(json!({ "removed": removed, "title": title }))
}

/// Add an owner. A review has at most [`Creator::MAX_ACTIVE`] active owners;
/// adding one to a live review pauses it.
pub(crate) fn add_creator(unit: &mut Unit<'_>, user_id: Uuid) -> Result<bool> {
  if unit.snap.is_creator(user_id) {
    return Ok(false);
  }
  if unit.snap.active_creators().count() >= Creator::MAX_ACTIVE {
    return Err(Error::Validation(format!(
      "a review may have at most {} owners",
      Creator::MAX_ACTIVE
    )));
  }

  let (review_id, now) = (unit.review_id(), unit.now);
  let row = match unit.snap.creator_mut(user_id) {
    Some(existing) => {
      existing.is_active = true;
      existing.modified_at = now;
      existing.clone()
    }
    None => {
      let row = Creator::new(review_id, user_id, now);
      unit.snap.creators.push(row.clone());
      row
    }
  };
  unit.push(Mutation::UpsertCreator(row.clone()));
  ensure_read_status(unit, user_id);

  let notice = owner_notice(unit, user_id, false);
  notify::send(unit, notice);
  events::record(unit, EventCode::OwnerAdded, &row);

  let state = unit.snap.review.demo_state;
  if state != DemoState::Draft && !state.is_terminal() {
    reminders::ensure(unit, user_id, ReminderKind::Creator, false);
    demo_machine::transition(unit, DemoState::Paused)?;
  }
  Ok(true)
}

/// Remove an owner. The last active owner cannot be removed.
pub(crate) fn drop_creator(unit: &mut Unit<'_>, user_id: Uuid) -> Result<bool> {
  let Some(row) = unit
    .snap
    .creator(user_id)
    .filter(|c| c.is_active)
    .cloned()
  else {
    return Ok(false);
  };
  if unit.snap.active_creators().count() <= 1 {
    return Err(Error::Validation(
      "a review must keep at least one owner".to_owned(),
    ));
  }

  unit.push(Mutation::DeactivateCreator {
    review_id: unit.review_id(),
    user_id,
    at: unit.now,
  });
  let now = unit.now;
  if let Some(c) = unit.snap.creator_mut(user_id) {
    c.is_active = false;
    c.modified_at = now;
  }

  let notice = owner_notice(unit, user_id, true);
  notify::send(unit, notice);
  events::record(unit, EventCode::OwnerRemoved, &row);
  reminders::remove(unit, user_id);
  Ok(true)
}
