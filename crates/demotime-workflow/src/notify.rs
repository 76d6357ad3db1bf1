//! NotificationDispatcher: in-app messages plus optional email.
//!
//! Every message is written as an [`Mutation::AppendMessage`], which the store
//! turns into a get-or-create of the recipient's bundle followed by an append
//! that revives the bundle. When the recipient has an email address an
//! [`EmailJob`] is queued as well; the job is only released after commit.

use chrono::{DateTime, Utc};
use demotime_core::{
  changeset::Mutation,
  message::{MessageTemplate, NewMessage},
  outbound::{EmailJob, OutboundJob},
  review::Revision,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{config::EngineConfig, unit::Unit};

/// One message to one recipient.
#[derive(Debug, Clone)]
pub(crate) struct Notice {
  pub to:        Uuid,
  pub title:     String,
  pub template:  MessageTemplate,
  pub context:   Value,
  pub thread_id: Option<Uuid>,
  /// Tie the message to the review's latest revision. Controls both the
  /// bundle the message lands in and the email subject.
  pub revision:  bool,
}

impl Notice {
  pub fn new(to: Uuid, title: impl Into<String>, template: MessageTemplate) -> Self {
    Self {
      to,
      title: title.into(),
      template,
      context: json!({}),
      thread_id: None,
      revision: true,
    }
  }

  pub fn with_context(mut self, context: Value) -> Self {
    self.context = context;
    self
  }

  pub fn in_thread(mut self, thread_id: Uuid) -> Self {
    self.thread_id = Some(thread_id);
    self
  }

  pub fn without_revision(mut self) -> Self {
    self.revision = false;
    self
  }
}

/// Queue `notice` on the unit: one message row, and an email when the
/// recipient has an address.
pub(crate) fn send(unit: &mut Unit<'_>, notice: Notice) {
  let revision = notice.revision.then(|| unit.snap.revision.clone());
  let review_title = unit.snap.review.title.clone();
  let email = unit.snap.user(notice.to).and_then(|u| u.email.clone());

  let (message, job) = compose(
    unit.config,
    notice,
    revision.as_ref(),
    &review_title,
    email,
    unit.now,
  );
  unit.push(Mutation::AppendMessage(message));
  if let Some(job) = job {
    unit.job(OutboundJob::Email(job));
  }
}

/// Send the same notice to each recipient in turn.
pub(crate) fn send_all(
  unit: &mut Unit<'_>,
  recipients: impl IntoIterator<Item = Uuid>,
  notice: impl Fn(Uuid) -> Notice,
) {
  for to in recipients {
    send(unit, notice(to));
  }
}

/// Build the message row and, if `email` is given, the email job.
///
/// With a revision the message belongs to that revision's review and the
/// email subject is `[DT-<review id>] - <review title>`; without one the
/// message lands in the recipient's review-less bundle and the subject is the
/// message title.
pub(crate) fn compose(
  config: &EngineConfig,
  notice: Notice,
  revision: Option<&Revision>,
  review_title: &str,
  email: Option<String>,
  now: DateTime<Utc>,
) -> (NewMessage, Option<EmailJob>) {
  let review_id = revision.map(|r| r.review_id);
  let body = render(config, &notice, review_id);

  let job = email.map(|to| EmailJob {
    to,
    subject: match review_id {
      Some(id) => format!("[DT-{id}] - {review_title}"),
      None => notice.title.clone(),
    },
    body: body.clone(),
  });

  tracing::debug!(
    recipient = %notice.to,
    template = notice.template.name(),
    emailed = job.is_some(),
    "message queued"
  );

  let message = NewMessage {
    message_id: Uuid::new_v4(),
    recipient_id: notice.to,
    sender_id: config.system_actor,
    review_id,
    revision_id: revision.map(|r| r.revision_id),
    thread_id: notice.thread_id,
    title: notice.title,
    template: notice.template,
    context: notice.context,
    body,
    created_at: now,
  };
  (message, job)
}

// ─── Rendering ───────────────────────────────────────────────────────────────

fn text<'a>(context: &'a Value, key: &str) -> &'a str {
  context.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Plain-text body: the title, one line of detail, and a link back to the
/// review when there is one.
fn render(config: &EngineConfig, notice: &Notice, review_id: Option<Uuid>) -> String {
  let ctx = &notice.context;
  let detail = match notice.template {
    MessageTemplate::Review => {
      format!("Revision {} is ready for review.", ctx["revision"])
    }
    MessageTemplate::Reviewer => match text(ctx, "change") {
      "removed" => "You are no longer a reviewer on this demo.".to_owned(),
      "announced" => format!("{} will be reviewing your demo.", text(ctx, "name")),
      _ => "Your feedback has been requested.".to_owned(),
    },
    MessageTemplate::ReviewerStatusChange => {
      format!("{} is now {}.", text(ctx, "name"), text(ctx, "status"))
    }
    MessageTemplate::Follower => format!("{} is now following.", text(ctx, "name")),
    MessageTemplate::Creator => {
      if ctx["removed"].as_bool().unwrap_or(false) {
        "You are no longer an owner of this demo.".to_owned()
      } else {
        "You are now an owner of this demo.".to_owned()
      }
    }
    MessageTemplate::Reopened => {
      if ctx["is_reviewer"].as_bool().unwrap_or(false) {
        format!(
          "The demo was {} and is open for review again.",
          text(ctx, "previous_state").to_lowercase()
        )
      } else {
        "The demo you follow is open again.".to_owned()
      }
    }
    MessageTemplate::Paused | MessageTemplate::Closed | MessageTemplate::Aborted => {
      format!("The demo was {} before this change.", text(ctx, "previous_state"))
    }
    MessageTemplate::Approved => "Every reviewer has approved.".to_owned(),
    MessageTemplate::Rejected => "Every reviewer has rejected.".to_owned(),
    MessageTemplate::Reviewing => format!(
      "The demo was {} and is back under review.",
      text(ctx, "previous_state")
    ),
    MessageTemplate::Reminder => "This demo is still waiting on you.".to_owned(),
    MessageTemplate::NewComment => text(ctx, "comment").to_owned(),
  };

  let mut body = format!("{}\n\n{detail}\n", notice.title);
  let link = review_id.or_else(|| {
    ctx
      .get("review_id")
      .and_then(Value::as_str)
      .and_then(|s| Uuid::parse_str(s).ok())
  });
  if let Some(id) = link {
    body.push_str(&format!("\n{}\n", config.review_url(id)));
  }
  body
}

#[cfg(test)]
mod tests {
  use super::*;

  fn revision() -> Revision {
    Revision {
      revision_id: Uuid::new_v4(),
      review_id:   Uuid::new_v4(),
      number:      3,
      description: String::new(),
      created_at:  Utc::now(),
    }
  }

  #[test]
  fn subject_uses_review_id_when_revision_given() {
    let config = EngineConfig::new(Uuid::new_v4());
    let rev = revision();
    let notice = Notice::new(Uuid::new_v4(), "New Review: Widget", MessageTemplate::Review)
      .with_context(json!({ "revision": 3 }));

    let (message, job) = compose(
      &config,
      notice,
      Some(&rev),
      "Widget",
      Some("rita@example.com".into()),
      Utc::now(),
    );

    let job = job.unwrap();
    assert_eq!(job.subject, format!("[DT-{}] - Widget", rev.review_id));
    assert_eq!(message.review_id, Some(rev.review_id));
    assert_eq!(message.sender_id, config.system_actor);
    assert!(message.body.contains("Revision 3"));
    assert!(message.body.contains(&config.review_url(rev.review_id)));
  }

  #[test]
  fn subject_falls_back_to_title_without_revision() {
    let config = EngineConfig::new(Uuid::new_v4());
    let notice = Notice::new(Uuid::new_v4(), "Reminder: Widget", MessageTemplate::Reminder)
      .without_revision();

    let (message, job) =
      compose(&config, notice, None, "Widget", Some("a@b.c".into()), Utc::now());
    assert_eq!(job.unwrap().subject, "Reminder: Widget");
    assert_eq!(message.review_id, None);
  }

  #[test]
  fn no_email_without_address() {
    let config = EngineConfig::new(Uuid::new_v4());
    let notice = Notice::new(Uuid::new_v4(), "t", MessageTemplate::Approved);
    let (_, job) = compose(&config, notice, Some(&revision()), "t", None, Utc::now());
    assert!(job.is_none());
  }
}
