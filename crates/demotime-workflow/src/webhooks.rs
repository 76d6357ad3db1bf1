//! WebhookDispatcher: queues a POST for every hook registered on the
//! review's project for a given trigger.
//!
//! Delivery and retries belong to the outbound worker; this side only decides
//! which hooks fire and builds their payload from the working copy.

use demotime_core::{
  outbound::{OutboundJob, WebhookJob},
  webhook::{Trigger, payload},
};
use serde_json::Value;

use crate::unit::Unit;

pub(crate) fn dispatch(unit: &mut Unit<'_>, trigger: Trigger, extra: Option<&Value>) {
  let hooks: Vec<_> = unit
    .snap
    .webhooks
    .iter()
    .filter(|h| h.trigger == trigger)
    .cloned()
    .collect();
  if hooks.is_empty() {
    return;
  }

  let review = unit.snap.to_json();
  for hook in hooks {
    tracing::debug!(
      review_id = %unit.review_id(),
      trigger = trigger.name(),
      url = %hook.target,
      "webhook queued"
    );
    let body = payload(&unit.snap.project.token, &hook, review.clone(), extra);
    unit.job(OutboundJob::Webhook(WebhookJob {
      webhook_id: hook.webhook_id,
      target:     hook.target,
      payload:    body,
    }));
  }
}
