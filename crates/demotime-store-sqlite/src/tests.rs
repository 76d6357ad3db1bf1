//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, TimeZone, Utc};
use demotime_core::{
  changeset::{ApplyOutcome, Changeset, Mutation, ReadScope},
  comment::{Comment, Issue},
  event::{Event, EventCode},
  message::{MessageTemplate, NewMessage},
  reminder::{Reminder, ReminderKind},
  review::{Creator, Review, Reviewer, Revision},
  settings::{REMINDER_DAYS, Setting, SettingType},
  state::{DemoState, ReviewerState},
  store::ReviewStore,
  user::{NewUser, User},
  webhook::Trigger,
};
use serde_json::json;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(hour: u32) -> chrono::DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 10, 19, hour, 0, 0).unwrap()
}

/// Insert a project, a creator, and an open review with one revision.
async fn seed(s: &SqliteStore) -> (Review, User) {
  let project = s.add_project("Widgets".into()).await.unwrap();
  let owner = s
    .add_user(NewUser::new("owner").with_email("owner@example.com"))
    .await
    .unwrap();

  let review = Review {
    review_id:      Uuid::new_v4(),
    project_id:     project.project_id,
    title:          "Widget".into(),
    description:    "first cut".into(),
    case_link:      String::new(),
    demo_state:     DemoState::Open,
    reviewer_state: ReviewerState::Reviewing,
    is_public:      false,
    created_at:     at(9),
    modified_at:    at(9),
  };
  let revision = Revision {
    revision_id: Uuid::new_v4(),
    review_id:   review.review_id,
    number:      1,
    description: "first cut".into(),
    created_at:  at(9),
  };

  let mut changes = Changeset::new();
  changes.push(Mutation::InsertReview(review.clone()));
  changes.push(Mutation::InsertRevision(revision));
  changes.push(Mutation::UpsertCreator(Creator::new(
    review.review_id,
    owner.user_id,
    at(9),
  )));
  assert_eq!(s.apply(changes).await.unwrap(), ApplyOutcome::Committed);
  (review, owner)
}

fn message(review_id: Option<Uuid>, to: Uuid, from: Uuid) -> NewMessage {
  NewMessage {
    message_id:   Uuid::new_v4(),
    recipient_id: to,
    sender_id:    from,
    review_id,
    revision_id:  None,
    thread_id:    None,
    title:        "hello".into(),
    template:     MessageTemplate::Review,
    context:      json!({ "k": 1 }),
    body:         "hello".into(),
    created_at:   at(10),
  }
}

// ─── Reference data ──────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_find_user() {
  let s = store().await;
  let user = s.add_user(NewUser::new("alice")).await.unwrap();

  let by_id = s.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(by_id.username, "alice");
  let by_name = s.find_user("alice").await.unwrap().unwrap();
  assert_eq!(by_name.user_id, user.user_id);
  assert!(s.find_user("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
  let s = store().await;
  s.add_user(NewUser::new("alice")).await.unwrap();
  let err = s.add_user(NewUser::new("alice")).await.unwrap_err();
  assert!(matches!(err, Error::UsernameTaken(name) if name == "alice"));
}

#[tokio::test]
async fn settings_are_replaced_per_key() {
  let s = store().await;
  let project = s.add_project("Widgets".into()).await.unwrap();

  s.put_setting(Setting::new(project.project_id, REMINDER_DAYS, "3", SettingType::Int))
    .await
    .unwrap();
  s.put_setting(Setting::new(project.project_id, REMINDER_DAYS, "5", SettingType::Int))
    .await
    .unwrap();

  let setting = s
    .get_setting(project.project_id, REMINDER_DAYS)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(setting.raw_value, "5");
  assert!(s.get_setting(project.project_id, "missing").await.unwrap().is_none());
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn load_review_assembles_snapshot() {
  let s = store().await;
  let (review, owner) = seed(&s).await;
  let reviewer = s.add_user(NewUser::new("rita")).await.unwrap();
  s.add_webhook(review.project_id, "https://hooks.example.com".into(), Trigger::Closed)
    .await
    .unwrap();

  let mut changes = Changeset::new();
  changes.push(Mutation::UpsertReviewer(Reviewer::new(
    review.review_id,
    reviewer.user_id,
    at(10),
  )));
  s.apply(changes).await.unwrap();

  let snap = s.load_review(review.review_id).await.unwrap().unwrap();
  assert_eq!(snap.review, review);
  assert_eq!(snap.revision.number, 1);
  assert_eq!(snap.creator_ids(), vec![owner.user_id]);
  assert_eq!(snap.reviewers.len(), 1);
  assert_eq!(snap.webhooks.len(), 1);
  assert_eq!(snap.user_name(reviewer.user_id), "rita");

  assert!(s.load_review(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn stale_state_write_rolls_back_whole_changeset() {
  let s = store().await;
  let (review, owner) = seed(&s).await;

  let mut changes = Changeset::new();
  changes.push(Mutation::InsertEvent(Event::new(
    review.project_id,
    EventCode::DemoClosed,
    &review,
    owner.user_id,
    at(10),
  )));
  // The stored state is `open`, not `paused`.
  changes.push(Mutation::SetDemoState {
    review_id: review.review_id,
    from:      DemoState::Paused,
    to:        DemoState::Closed,
    at:        at(10),
  });

  assert_eq!(s.apply(changes).await.unwrap(), ApplyOutcome::Conflict);
  assert!(s.events(review.review_id).await.unwrap().is_empty());
  let snap = s.load_review(review.review_id).await.unwrap().unwrap();
  assert_eq!(snap.review.demo_state, DemoState::Open);
}

#[tokio::test]
async fn reviewer_upsert_reactivates_existing_row() {
  let s = store().await;
  let (review, _) = seed(&s).await;
  let user = Uuid::new_v4();
  let row = Reviewer::new(review.review_id, user, at(10));

  let mut changes = Changeset::new();
  changes.push(Mutation::UpsertReviewer(row.clone()));
  changes.push(Mutation::SetReviewerStatus {
    review_id: review.review_id,
    user_id:   user,
    status:    ReviewerState::Approved,
    at:        at(10),
  });
  changes.push(Mutation::DeactivateReviewer {
    review_id: review.review_id,
    user_id:   user,
    at:        at(11),
  });
  changes.push(Mutation::UpsertReviewer(Reviewer::new(review.review_id, user, at(12))));
  s.apply(changes).await.unwrap();

  let snap = s.load_review(review.review_id).await.unwrap().unwrap();
  assert_eq!(snap.reviewers.len(), 1);
  let stored = &snap.reviewers[0];
  assert_eq!(stored.reviewer_id, row.reviewer_id);
  assert!(stored.is_active);
  assert_eq!(stored.status, ReviewerState::Reviewing);
}

#[tokio::test]
async fn mark_unread_respects_scope() {
  let s = store().await;
  let (review, owner) = seed(&s).await;
  let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

  let mut changes = Changeset::new();
  for user in [owner.user_id, a, b] {
    changes.push(Mutation::SetReadStatus {
      review_id: review.review_id,
      user_id:   user,
      read:      true,
      at:        at(10),
    });
  }
  changes.push(Mutation::MarkUnread {
    review_id: review.review_id,
    scope:     ReadScope::AllExcept(a),
    at:        at(11),
  });
  s.apply(changes).await.unwrap();

  let statuses = s.read_statuses(review.review_id).await.unwrap();
  for st in &statuses {
    assert_eq!(st.read, st.user_id == a, "user {}", st.user_id);
  }

  let mut changes = Changeset::new();
  changes.push(Mutation::MarkUnread {
    review_id: review.review_id,
    scope:     ReadScope::Only(a),
    at:        at(12),
  });
  s.apply(changes).await.unwrap();
  let statuses = s.read_statuses(review.review_id).await.unwrap();
  assert!(statuses.iter().all(|st| !st.read));
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn appending_revives_bundle() {
  let s = store().await;
  let (review, owner) = seed(&s).await;
  let to = Uuid::new_v4();

  let mut changes = Changeset::new();
  changes.push(Mutation::AppendMessage(message(Some(review.review_id), to, owner.user_id)));
  s.apply(changes).await.unwrap();

  let bundles = s.bundles(to).await.unwrap();
  assert_eq!(bundles.len(), 1);
  let bundle = &bundles[0];
  assert!(s.set_bundle_flags(bundle.bundle_id, true, true).await.unwrap());

  let mut changes = Changeset::new();
  changes.push(Mutation::AppendMessage(message(Some(review.review_id), to, owner.user_id)));
  s.apply(changes).await.unwrap();

  let bundles = s.bundles(to).await.unwrap();
  assert_eq!(bundles.len(), 1);
  assert!(!bundles[0].read);
  assert!(!bundles[0].deleted);

  let messages = s.messages(bundle.bundle_id).await.unwrap();
  assert_eq!(messages.len(), 2);
  assert_eq!(messages[0].context["k"], 1);
  assert_eq!(messages[0].review_id, Some(review.review_id));
}

#[tokio::test]
async fn review_less_bundle_is_shared() {
  let s = store().await;
  let to = Uuid::new_v4();
  let from = Uuid::new_v4();

  for _ in 0..2 {
    let mut changes = Changeset::new();
    changes.push(Mutation::AppendMessage(message(None, to, from)));
    s.apply(changes).await.unwrap();
  }

  let bundles = s.bundles(to).await.unwrap();
  assert_eq!(bundles.len(), 1);
  assert_eq!(bundles[0].review_id, None);
  assert_eq!(s.messages(bundles[0].bundle_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn set_flags_on_missing_bundle_returns_false() {
  let s = store().await;
  assert!(!s.set_bundle_flags(Uuid::new_v4(), true, false).await.unwrap());
}

// ─── Reminders ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn one_reminder_per_review_and_user() {
  let s = store().await;
  let (review, owner) = seed(&s).await;

  let mut changes = Changeset::new();
  for hour in [10, 11] {
    changes.push(Mutation::EnsureReminder(Reminder::new(
      review.review_id,
      owner.user_id,
      ReminderKind::Creator,
      at(hour),
      at(9),
    )));
  }
  s.apply(changes).await.unwrap();

  let reminders = s.reminders(review.review_id).await.unwrap();
  assert_eq!(reminders.len(), 1);
  assert_eq!(reminders[0].remind_at, at(10));
}

#[tokio::test]
async fn due_reminders_and_reschedule_guard() {
  let s = store().await;
  let (review, owner) = seed(&s).await;
  let later = Uuid::new_v4();

  let mut changes = Changeset::new();
  changes.push(Mutation::EnsureReminder(Reminder::new(
    review.review_id,
    owner.user_id,
    ReminderKind::Creator,
    at(10),
    at(9),
  )));
  changes.push(Mutation::EnsureReminder(Reminder::new(
    review.review_id,
    later,
    ReminderKind::Reviewer,
    at(10) + Duration::days(3),
    at(9),
  )));
  s.apply(changes).await.unwrap();

  let due = s.due_reminders(at(12)).await.unwrap();
  assert_eq!(due.len(), 1);
  let first = &due[0];
  assert_eq!(first.reminder.user_id, owner.user_id);
  assert_eq!(first.review_title, "Widget");
  assert_eq!(first.recipient_email.as_deref(), Some("owner@example.com"));

  let reschedule = |expected| {
    let mut changes = Changeset::new();
    changes.push(Mutation::RescheduleReminder {
      reminder_id: first.reminder.reminder_id,
      expected,
      remind_at: at(10) + Duration::days(2),
      at: at(12),
    });
    changes
  };
  assert_eq!(s.apply(reschedule(at(10))).await.unwrap(), ApplyOutcome::Committed);
  // A second poller holding the old due date loses.
  assert_eq!(s.apply(reschedule(at(10))).await.unwrap(), ApplyOutcome::Conflict);
  assert!(s.due_reminders(at(12)).await.unwrap().is_empty());
}

#[tokio::test]
async fn deactivated_reminders_are_never_due() {
  let s = store().await;
  let (review, owner) = seed(&s).await;

  let mut changes = Changeset::new();
  changes.push(Mutation::EnsureReminder(Reminder::new(
    review.review_id,
    owner.user_id,
    ReminderKind::Creator,
    at(10),
    at(9),
  )));
  changes.push(Mutation::SetReminderActive {
    review_id: review.review_id,
    user_id:   None,
    active:    false,
    remind_at: None,
    at:        at(9),
  });
  s.apply(changes).await.unwrap();

  assert!(s.due_reminders(at(23)).await.unwrap().is_empty());
  let reminders = s.reminders(review.review_id).await.unwrap();
  assert_eq!(reminders[0].remind_at, at(10));
}

// ─── Comments and issues ─────────────────────────────────────────────────────

#[tokio::test]
async fn only_one_open_issue_per_comment() {
  let s = store().await;
  let (review, owner) = seed(&s).await;
  let snap = s.load_review(review.review_id).await.unwrap().unwrap();

  let comment = Comment {
    comment_id:   Uuid::new_v4(),
    review_id:    review.review_id,
    revision_id:  snap.revision.revision_id,
    thread_id:    Uuid::new_v4(),
    commenter_id: owner.user_id,
    body:         "needs work".into(),
    created_at:   at(10),
  };
  let issue = |id| Issue {
    issue_id: id,
    review_id: review.review_id,
    comment_id: comment.comment_id,
    created_by: owner.user_id,
    resolved_by: None,
    created_at: at(10),
    modified_at: at(10),
  };

  let first = Uuid::new_v4();
  let mut changes = Changeset::new();
  changes.push(Mutation::InsertComment(comment.clone()));
  changes.push(Mutation::InsertIssue(issue(first)));
  assert_eq!(s.apply(changes).await.unwrap(), ApplyOutcome::Committed);

  let mut changes = Changeset::new();
  changes.push(Mutation::InsertIssue(issue(Uuid::new_v4())));
  assert_eq!(s.apply(changes).await.unwrap(), ApplyOutcome::Conflict);

  let mut changes = Changeset::new();
  changes.push(Mutation::ResolveIssue {
    issue_id:    first,
    resolved_by: owner.user_id,
    at:          at(11),
  });
  changes.push(Mutation::InsertIssue(issue(Uuid::new_v4())));
  assert_eq!(s.apply(changes).await.unwrap(), ApplyOutcome::Committed);

  assert_eq!(s.issues(review.review_id).await.unwrap().len(), 2);
  assert!(s.get_issue(first).await.unwrap().unwrap().is_resolved());
  assert_eq!(
    s.get_comment(comment.comment_id).await.unwrap().unwrap().body,
    "needs work"
  );
}
