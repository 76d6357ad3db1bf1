//! Read-status invalidation after a state change.
//!
//! The two machines invalidate differently. A demo-state change marks every
//! participant except the actor unread; a consensus change only touches the
//! acting user's own row. Both then fire the matching webhook.

use demotime_core::{
  changeset::{Mutation, ReadScope},
  webhook::Trigger,
};
use serde_json::Value;

use crate::{unit::Unit, webhooks};

pub(crate) fn demo_state(unit: &mut Unit<'_>, trigger: Trigger, extra: Option<&Value>) {
  unit.push(Mutation::MarkUnread {
    review_id: unit.review_id(),
    scope:     ReadScope::AllExcept(unit.actor),
    at:        unit.now,
  });
  webhooks::dispatch(unit, trigger, extra);
}

pub(crate) fn reviewer_state(unit: &mut Unit<'_>, trigger: Trigger) {
  unit.push(Mutation::MarkUnread {
    review_id: unit.review_id(),
    scope:     ReadScope::Only(unit.actor),
    at:        unit.now,
  });
  webhooks::dispatch(unit, trigger, None);
}
