//! Outbound webhook registrations and their JSON payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{
  Error,
  Result,
  state::{DemoState, ReviewerState},
};

/// The occurrence a webhook subscribes to.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Trigger {
  Created,
  Reopened,
  Paused,
  Closed,
  Aborted,
  Reviewing,
  Approved,
  Rejected,
  Comment,
  Updated,
}

impl Trigger {
  pub fn name(self) -> &'static str { self.into() }

  pub fn from_name(name: &str) -> Result<Self> {
    name
      .parse()
      .map_err(|_| Error::UnknownTrigger(name.to_owned()))
  }

  /// Trigger fired when a demo enters `state`, named after the state itself.
  /// `open` has no same-named trigger (it fires `created` or `reopened`).
  pub fn for_demo_state(state: DemoState) -> Option<Self> {
    match state {
      DemoState::Paused => Some(Self::Paused),
      DemoState::Closed => Some(Self::Closed),
      DemoState::Aborted => Some(Self::Aborted),
      DemoState::Draft | DemoState::Open | DemoState::Cancelled => None,
    }
  }

  pub fn for_reviewer_state(state: ReviewerState) -> Self {
    match state {
      ReviewerState::Reviewing => Self::Reviewing,
      ReviewerState::Approved => Self::Approved,
      ReviewerState::Rejected => Self::Rejected,
    }
  }
}

/// A webhook registered for one (project, trigger) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebHook {
  pub webhook_id: Uuid,
  pub project_id: Uuid,
  pub target:     String,
  pub trigger:    Trigger,
  pub created_at: DateTime<Utc>,
}

impl WebHook {
  /// The `webhook` descriptor embedded in payloads.
  pub fn to_json(&self) -> Value {
    json!({
      "webhook_id": self.webhook_id,
      "project_id": self.project_id,
      "target": self.target,
      "trigger_event": self.trigger,
    })
  }
}

/// Build the body posted to a webhook target:
/// `{token, webhook: {...}, review: {...}, ...extra}`.
///
/// Keys of `extra` (when it is an object) are merged at the top level; they
/// never replace `token`, `webhook`, or `review`.
pub fn payload(
  token: &str,
  hook: &WebHook,
  review: Value,
  extra: Option<&Value>,
) -> Value {
  let mut body = Map::new();
  if let Some(Value::Object(extra)) = extra {
    for (k, v) in extra {
      body.insert(k.clone(), v.clone());
    }
  }
  body.insert("token".into(), Value::String(token.to_owned()));
  body.insert("webhook".into(), hook.to_json());
  body.insert("review".into(), review);
  Value::Object(body)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn hook() -> WebHook {
    WebHook {
      webhook_id: Uuid::new_v4(),
      project_id: Uuid::new_v4(),
      target:     "https://hooks.example.com/dt".into(),
      trigger:    Trigger::Comment,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn payload_merges_extra_without_clobbering() {
    let hook = hook();
    let extra = json!({ "comment": { "body": "nice" }, "token": "forged" });
    let body = payload("secret", &hook, json!({ "title": "Widget" }), Some(&extra));

    assert_eq!(body["token"], "secret");
    assert_eq!(body["comment"]["body"], "nice");
    assert_eq!(body["review"]["title"], "Widget");
    assert_eq!(body["webhook"]["trigger_event"], "comment");
    assert_eq!(body["webhook"]["target"], "https://hooks.example.com/dt");
  }

  #[test]
  fn demo_state_triggers() {
    assert_eq!(Trigger::for_demo_state(DemoState::Closed), Some(Trigger::Closed));
    assert_eq!(Trigger::for_demo_state(DemoState::Open), None);
    assert_eq!(
      Trigger::for_reviewer_state(ReviewerState::Approved),
      Trigger::Approved
    );
  }
}
