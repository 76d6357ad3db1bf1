use demotime_core::{
  event::EventCode,
  state::{DemoState, ReviewerState},
  store::ReviewStore,
  webhook::Trigger,
};

use super::*;
use crate::Error;

#[tokio::test]
async fn unanimous_approval_approves() {
  let h = Harness::new().await;
  let id = h.open_review().await;

  let first = h
    .wf
    .cast_vote(id, h.alice.user_id, ReviewerState::Approved)
    .await
    .unwrap();
  assert_eq!(first, None);
  assert!(h
    .titles(&h.owner)
    .await
    .contains(&"alice has approved your review: Widget".to_owned()));

  let second = h
    .wf
    .cast_vote(id, h.bob.user_id, ReviewerState::Approved)
    .await
    .unwrap();
  assert_eq!(second, Some(ReviewerState::Approved));

  let snap = h.snap(id).await;
  assert_eq!(snap.review.reviewer_state, ReviewerState::Approved);
  // Consensus never touches the demo state.
  assert_eq!(snap.review.demo_state, DemoState::Open);

  let codes = h.codes(id).await;
  assert!(codes.contains(&EventCode::ReviewerApproved));
  assert_eq!(codes.last(), Some(&EventCode::DemoApproved));
  let owner_titles = h.titles(&h.owner).await;
  assert!(owner_titles.contains(&"\"Widget\" has been Approved!".to_owned()));
  // The deciding vote is announced through the consensus message only.
  assert!(!owner_titles.contains(&"bob has approved your review: Widget".to_owned()));
}

#[tokio::test]
async fn split_votes_keep_reviewing() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  h.wf
    .cast_vote(id, h.alice.user_id, ReviewerState::Approved)
    .await
    .unwrap();
  let outcome = h
    .wf
    .cast_vote(id, h.bob.user_id, ReviewerState::Rejected)
    .await
    .unwrap();

  assert_eq!(outcome, None);
  assert_eq!(h.snap(id).await.review.reviewer_state, ReviewerState::Reviewing);
}

#[tokio::test]
async fn unanimous_rejection_rejects() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  for voter in [h.alice.user_id, h.bob.user_id] {
    h.wf
      .cast_vote(id, voter, ReviewerState::Rejected)
      .await
      .unwrap();
  }
  assert_eq!(h.snap(id).await.review.reviewer_state, ReviewerState::Rejected);
  assert!(h
    .titles(&h.owner)
    .await
    .contains(&"\"Widget\" has been Rejected".to_owned()));
}

#[tokio::test]
async fn withdrawn_approval_goes_back_under_review() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  for voter in [h.alice.user_id, h.bob.user_id] {
    h.wf
      .cast_vote(id, voter, ReviewerState::Approved)
      .await
      .unwrap();
  }

  let outcome = h
    .wf
    .cast_vote(id, h.alice.user_id, ReviewerState::Reviewing)
    .await
    .unwrap();

  assert_eq!(outcome, Some(ReviewerState::Reviewing));
  assert_eq!(h.codes(id).await.last(), Some(&EventCode::DemoReviewing));
  assert!(h
    .titles(&h.owner)
    .await
    .contains(&"\"Widget\" is back Under Review".to_owned()));
}

#[tokio::test]
async fn repeated_vote_is_logged_without_messaging() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  h.wf
    .cast_vote(id, h.alice.user_id, ReviewerState::Rejected)
    .await
    .unwrap();
  let before = h.titles(&h.owner).await.len();

  h.wf
    .cast_vote(id, h.alice.user_id, ReviewerState::Rejected)
    .await
    .unwrap();

  assert_eq!(h.titles(&h.owner).await.len(), before);
  let rejections = h
    .codes(id)
    .await
    .into_iter()
    .filter(|c| *c == EventCode::ReviewerRejected)
    .count();
  assert_eq!(rejections, 2);
}

#[tokio::test]
async fn only_active_reviewers_vote_and_only_while_open() {
  let h = Harness::new().await;
  let id = h.open_review().await;

  let err = h
    .wf
    .cast_vote(id, h.fred.user_id, ReviewerState::Approved)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ReviewerNotFound { user_id, .. } if user_id == h.fred.user_id));

  h.wf
    .transition(id, DemoState::Paused, h.owner.user_id)
    .await
    .unwrap();
  let err = h
    .wf
    .cast_vote(id, h.alice.user_id, ReviewerState::Approved)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn consensus_change_only_marks_the_voter_unread() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  for user in [h.alice.user_id, h.bob.user_id, h.fred.user_id] {
    h.wf.mark_viewed(id, user).await.unwrap();
  }
  h.wf
    .cast_vote(id, h.alice.user_id, ReviewerState::Approved)
    .await
    .unwrap();
  h.wf
    .cast_vote(id, h.bob.user_id, ReviewerState::Approved)
    .await
    .unwrap();

  assert_eq!(h.read(id, &h.bob).await, Some(false));
  assert_eq!(h.read(id, &h.alice).await, Some(true));
  assert_eq!(h.read(id, &h.fred).await, Some(true));
}

#[tokio::test]
async fn approved_webhook_fires_once() {
  let h = Harness::new().await;
  h.wf
    .store()
    .add_webhook(h.project.project_id, "https://hooks.example.com/ok".into(), Trigger::Approved)
    .await
    .unwrap();
  let id = h.open_review().await;
  for voter in [h.alice.user_id, h.bob.user_id] {
    h.wf
      .cast_vote(id, voter, ReviewerState::Approved)
      .await
      .unwrap();
  }

  let hooks = h.wf.queue().webhooks();
  assert_eq!(hooks.len(), 1);
  assert_eq!(hooks[0].payload["review"]["reviewer_state"], "approved");
}

#[tokio::test]
async fn voting_toggles_the_voters_reminder() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  h.wf
    .cast_vote(id, h.alice.user_id, ReviewerState::Approved)
    .await
    .unwrap();

  let reminder = |rs: &[demotime_core::reminder::Reminder], user: Uuid| {
    rs.iter().find(|r| r.user_id == user).map(|r| r.active)
  };
  let rs = h.wf.store().reminders(id).await.unwrap();
  assert_eq!(reminder(&rs, h.alice.user_id), Some(false));
  assert_eq!(reminder(&rs, h.bob.user_id), Some(true));

  h.wf
    .cast_vote(id, h.alice.user_id, ReviewerState::Reviewing)
    .await
    .unwrap();
  let rs = h.wf.store().reminders(id).await.unwrap();
  assert_eq!(reminder(&rs, h.alice.user_id), Some(true));
}

#[tokio::test]
async fn recompute_is_idempotent() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  let before = h.codes(id).await.len();
  assert_eq!(h.wf.recompute(id, h.system.user_id).await.unwrap(), None);
  assert_eq!(h.codes(id).await.len(), before);
}

#[tokio::test]
async fn consensus_change_decides_the_voters_reminder() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  for voter in [h.alice.user_id, h.bob.user_id] {
    h.wf
      .cast_vote(id, voter, ReviewerState::Approved)
      .await
      .unwrap();
  }

  // A rejection breaks unanimity, so the review is back under review and the
  // voter is reminded again even though their own vote is not `reviewing`.
  let moved = h
    .wf
    .cast_vote(id, h.alice.user_id, ReviewerState::Rejected)
    .await
    .unwrap();
  assert_eq!(moved, Some(ReviewerState::Reviewing));

  let rs = h.wf.store().reminders(id).await.unwrap();
  let alice = rs.iter().find(|r| r.user_id == h.alice.user_id).unwrap();
  assert!(alice.active);
  assert!(alice.remind_at > monday());
}
