//! DemoStateMachine: the primary review lifecycle.
//!
//! ```text
//!   draft ──► open ◄──► paused / closed / aborted
//!     │
//!     └──► cancelled (terminal)
//! ```
//!
//! A transition writes the new `demo_state` and then runs the entry action of
//! the target state. Requesting the current state is a no-op with no side
//! effects, so callers may transition speculatively.

use demotime_core::{
  changeset::Mutation,
  event::EventCode,
  message::MessageTemplate,
  state::{DemoState, ReviewerState},
  webhook::Trigger,
};
use serde_json::json;

use crate::{
  Error,
  Result,
  events,
  fanout,
  notify::{self, Notice},
  reminders,
  unit::Unit,
};

/// Move the working copy to `target`. Returns `false` when the review is
/// already there.
pub(crate) fn transition(unit: &mut Unit<'_>, target: DemoState) -> Result<bool> {
  let from = unit.snap.review.demo_state;
  if from == target {
    tracing::debug!(review_id = %unit.review_id(), state = %target, "transition is a no-op");
    return Ok(false);
  }
  // Only a draft is discarded; a live review is closed or aborted instead.
  let discards_live = target == DemoState::Cancelled && from != DemoState::Draft;
  if from.is_terminal() || discards_live {
    return Err(Error::InvalidTransition { from, to: target });
  }

  unit.push(Mutation::SetDemoState {
    review_id: unit.review_id(),
    from,
    to: target,
    at: unit.now,
  });
  unit.snap.review.demo_state = target;
  unit.touch();
  tracing::info!(
    review_id = %unit.review_id(),
    actor = %unit.actor,
    from = %from,
    to = %target,
    "demo state changed"
  );

  enter(unit, target, from);
  Ok(true)
}

/// Entry-action dispatch table.
fn enter(unit: &mut Unit<'_>, state: DemoState, from: DemoState) {
  match state {
    DemoState::Open if from == DemoState::Draft => on_created(unit),
    DemoState::Open => on_reopened(unit, from),
    DemoState::Paused | DemoState::Closed | DemoState::Aborted => {
      on_halted(unit, state, from)
    }
    DemoState::Draft | DemoState::Cancelled => {}
  }
}

// ─── Entry actions ───────────────────────────────────────────────────────────

/// First activation of a review.
fn on_created(unit: &mut Unit<'_>) {
  events::record_review(unit, EventCode::DemoCreated);

  // The creators have obviously seen what they just opened.
  for creator in unit.snap.creator_ids() {
    unit.push(Mutation::SetReadStatus {
      review_id: unit.review_id(),
      user_id:   creator,
      read:      true,
      at:        unit.now,
    });
  }

  let title = format!("New Review: {}", unit.snap.review.title);
  let context = json!({
    "review_id": unit.review_id(),
    "revision": unit.snap.revision.number,
  });
  let audience = unit.snap.audience();
  notify::send_all(unit, audience, |to| {
    Notice::new(to, title.clone(), MessageTemplate::Review).with_context(context.clone())
  });

  reminders::schedule_for_review(unit);
  unit.push(Mutation::TouchParticipants {
    review_id: unit.review_id(),
    at:        unit.now,
  });

  let reviewers: Vec<_> = unit.snap.active_reviewers().cloned().collect();
  for reviewer in &reviewers {
    events::record(unit, EventCode::ReviewerAdded, reviewer);
  }
  let followers: Vec<_> = unit.snap.active_followers().cloned().collect();
  for follower in &followers {
    events::record(unit, EventCode::FollowerAdded, follower);
  }

  fanout::demo_state(unit, Trigger::Created, None);
}

/// Reopen from `paused`, `closed`, or `aborted`.
fn on_reopened(unit: &mut Unit<'_>, from: DemoState) {
  events::record_review(unit, EventCode::DemoOpened);

  let title = format!("\"{}\" has been Reopened", unit.snap.review.title);
  let audience = unit.snap.audience();
  for to in audience {
    let is_reviewer = unit.snap.is_reviewer(to);
    let notice = Notice::new(to, title.clone(), MessageTemplate::Reopened).with_context(json!({
      "review_id": unit.review_id(),
      "previous_state": from.title(),
      "is_reviewer": is_reviewer,
    }));
    notify::send(unit, notice);
  }

  // Every vote starts over.
  unit.push(Mutation::ResetReviewerVotes {
    review_id: unit.review_id(),
    at:        unit.now,
  });
  for reviewer in unit.snap.reviewers.iter_mut().filter(|r| r.is_active) {
    reviewer.status = ReviewerState::Reviewing;
  }
  let consensus = unit.snap.review.reviewer_state;
  if consensus != ReviewerState::Reviewing {
    unit.push(Mutation::SetReviewerState {
      review_id: unit.review_id(),
      from:      consensus,
      to:        ReviewerState::Reviewing,
      at:        unit.now,
    });
    unit.snap.review.reviewer_state = ReviewerState::Reviewing;
  }

  reminders::set_active_for_review(unit, true);
  fanout::demo_state(unit, Trigger::Reopened, None);
}

/// Entering `paused`, `closed`, or `aborted`.
fn on_halted(unit: &mut Unit<'_>, state: DemoState, from: DemoState) {
  let (code, template) = match state {
    DemoState::Paused => (EventCode::DemoPaused, MessageTemplate::Paused),
    DemoState::Closed => (EventCode::DemoClosed, MessageTemplate::Closed),
    _ => (EventCode::DemoAborted, MessageTemplate::Aborted),
  };
  events::record_review(unit, code);

  let title = format!("\"{}\" has been {}", unit.snap.review.title, state.title());
  let context = json!({
    "review_id": unit.review_id(),
    "previous_state": from.title(),
  });
  let audience = unit.snap.audience();
  notify::send_all(unit, audience, |to| {
    Notice::new(to, title.clone(), template).with_context(context.clone())
  });

  reminders::set_active_for_review(unit, false);
  if let Some(trigger) = Trigger::for_demo_state(state) {
    fanout::demo_state(unit, trigger, None);
  }
}
