use demotime_core::{
  settings::{REMINDER_DAYS, Setting, SettingType},
  state::{DemoState, ReviewerState},
  store::ReviewStore,
};

use super::*;

#[tokio::test]
async fn reminders_fire_after_two_business_days() {
  let h = Harness::new().await;
  let id = h.open_review().await;

  assert_eq!(h.wf.fire_due_reminders().await.unwrap(), 0);

  h.clock.set(day(21));
  assert_eq!(h.wf.fire_due_reminders().await.unwrap(), 3);

  let reminders = h.wf.store().reminders(id).await.unwrap();
  assert!(reminders.iter().all(|r| r.remind_at == day(23)));

  // Reminder messages land in the review-less bundle.
  let reminder = h
    .messages(&h.alice)
    .await
    .into_iter()
    .find(|m| m.title == "Reminder: Widget")
    .unwrap();
  assert_eq!(reminder.review_id, None);
  assert_eq!(reminder.sender_id, h.system.user_id);

  let emails = h.wf.queue().emails();
  assert_eq!(emails.len(), 3);
  assert!(emails.iter().all(|e| e.subject == "Reminder: Widget"));

  // Already pushed out; nothing is due again at the same instant.
  assert_eq!(h.wf.fire_due_reminders().await.unwrap(), 0);
}

#[tokio::test]
async fn friday_reminder_skips_the_weekend() {
  let h = Harness::new().await;
  h.clock.set(day(23));
  let id = h.open_review().await;

  let reminders = h.wf.store().reminders(id).await.unwrap();
  assert!(reminders.iter().all(|r| r.remind_at == day(27)));
}

#[tokio::test]
async fn project_setting_overrides_the_interval() {
  let h = Harness::new().await;
  h.wf
    .store()
    .put_setting(Setting::new(
      h.project.project_id,
      REMINDER_DAYS,
      "5",
      SettingType::Int,
    ))
    .await
    .unwrap();
  let id = h.open_review().await;

  let reminders = h.wf.store().reminders(id).await.unwrap();
  assert!(reminders.iter().all(|r| r.remind_at == day(26)));
}

#[tokio::test]
async fn voted_and_paused_reminders_stay_quiet() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  h.wf
    .cast_vote(id, h.alice.user_id, ReviewerState::Approved)
    .await
    .unwrap();

  h.clock.set(day(21));
  // Owner and Bob; Alice has voted.
  assert_eq!(h.wf.fire_due_reminders().await.unwrap(), 2);
  assert!(!h
    .titles(&h.alice)
    .await
    .contains(&"Reminder: Widget".to_owned()));

  h.wf
    .transition(id, DemoState::Paused, h.owner.user_id)
    .await
    .unwrap();
  h.clock.set(day(28));
  assert_eq!(h.wf.fire_due_reminders().await.unwrap(), 0);
}

#[tokio::test]
async fn draft_has_no_reminders_until_opened() {
  let h = Harness::new().await;
  let mut input = h.new_review();
  input.draft = true;
  let snap = h.wf.create_review(input, h.owner.user_id).await.unwrap();
  let id = snap.review.review_id;

  h.clock.set(day(28));
  assert_eq!(h.wf.fire_due_reminders().await.unwrap(), 0);

  h.wf
    .transition(id, DemoState::Open, h.owner.user_id)
    .await
    .unwrap();
  let reminders = h.wf.store().reminders(id).await.unwrap();
  assert_eq!(reminders.len(), 3);
  // Wednesday 28th + 2 business days.
  assert!(reminders.iter().all(|r| r.remind_at == day(30)));
}
