//! EventLog: appends domain occurrences to the review's log.

use demotime_core::{
  changeset::Mutation,
  event::{Event, EventCode, Related},
};

use crate::unit::Unit;

/// Record `code` against `related`, attributed to the unit's actor.
pub(crate) fn record(unit: &mut Unit<'_>, code: EventCode, related: &impl Related) {
  let event = Event::new(unit.project_id(), code, related, unit.actor, unit.now);
  tracing::debug!(
    review_id = %event.review_id,
    code = event.code.code(),
    related = %event.related_id,
    "event recorded"
  );
  unit.push(Mutation::InsertEvent(event));
}

/// Record `code` against the review itself.
pub(crate) fn record_review(unit: &mut Unit<'_>, code: EventCode) {
  let review = unit.snap.review.clone();
  record(unit, code, &review);
}
