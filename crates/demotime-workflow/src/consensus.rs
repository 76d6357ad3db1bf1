//! ReviewerConsensusEngine: derives the review's `reviewer_state` from the
//! individual votes of its active reviewers.

use demotime_core::{
  changeset::Mutation,
  event::EventCode,
  message::MessageTemplate,
  state::ReviewerState,
  webhook::Trigger,
};
use serde_json::json;

use crate::{
  events,
  fanout,
  notify::{self, Notice},
  reminders,
  unit::Unit,
};

/// The consensus for a set of votes.
///
/// Unanimous approval gives `approved`, unanimous rejection gives `rejected`,
/// and anything else (including no votes at all) gives `reviewing`.
pub fn derive(votes: impl IntoIterator<Item = ReviewerState>) -> ReviewerState {
  let mut votes = votes.into_iter().peekable();
  let Some(&first) = votes.peek() else {
    return ReviewerState::Reviewing;
  };
  if first != ReviewerState::Reviewing && votes.all(|v| v == first) {
    first
  } else {
    ReviewerState::Reviewing
  }
}

/// Recompute the consensus from the working copy and, if it moved, run the
/// entry action of the new state. Returns the new state when it changed.
pub(crate) fn recompute(unit: &mut Unit<'_>) -> Option<ReviewerState> {
  let current = unit.snap.review.reviewer_state;
  let target = derive(unit.snap.active_reviewers().map(|r| r.status));
  if target == current {
    tracing::debug!(review_id = %unit.review_id(), state = %current, "consensus unchanged");
    return None;
  }

  unit.push(Mutation::SetReviewerState {
    review_id: unit.review_id(),
    from:      current,
    to:        target,
    at:        unit.now,
  });
  unit.snap.review.reviewer_state = target;
  unit.touch();
  tracing::info!(
    review_id = %unit.review_id(),
    actor = %unit.actor,
    from = %current,
    to = %target,
    "consensus changed"
  );

  enter(unit, target, current);
  Some(target)
}

fn enter(unit: &mut Unit<'_>, state: ReviewerState, previous: ReviewerState) {
  let title = &unit.snap.review.title;
  let (code, template, subject) = match state {
    ReviewerState::Approved => (
      EventCode::DemoApproved,
      MessageTemplate::Approved,
      format!("\"{title}\" has been Approved!"),
    ),
    ReviewerState::Rejected => (
      EventCode::DemoRejected,
      MessageTemplate::Rejected,
      format!("\"{title}\" has been Rejected"),
    ),
    ReviewerState::Reviewing => (
      EventCode::DemoReviewing,
      MessageTemplate::Reviewing,
      format!("\"{title}\" is back Under Review"),
    ),
  };

  events::record_review(unit, code);

  let context = json!({
    "review_id": unit.review_id(),
    "title": unit.snap.review.title,
    "previous_state": previous.title(),
  });
  let creators = unit.snap.creator_ids();
  notify::send_all(unit, creators, |to| {
    Notice::new(to, subject.clone(), template).with_context(context.clone())
  });

  fanout::reviewer_state(unit, Trigger::for_reviewer_state(state));

  // The voter's own reminder follows the new consensus.
  let actor = unit.actor;
  if unit.snap.is_reviewer(actor) {
    reminders::set_active(unit, actor, state == ReviewerState::Reviewing);
  }
}
