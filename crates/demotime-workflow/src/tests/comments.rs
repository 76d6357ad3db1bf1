use demotime_core::{
  event::EventCode,
  state::DemoState,
  store::ReviewStore,
  webhook::Trigger,
};

use super::*;
use crate::{Error, ReviewUpdate};

#[tokio::test]
async fn comment_reaches_everyone_but_the_author() {
  let h = Harness::new().await;
  h.wf
    .store()
    .add_webhook(h.project.project_id, "https://hooks.example.com/c".into(), Trigger::Comment)
    .await
    .unwrap();
  let id = h.open_review().await;
  for user in [h.owner.user_id, h.alice.user_id, h.bob.user_id, h.fred.user_id] {
    h.wf.mark_viewed(id, user).await.unwrap();
  }

  let comment = h
    .wf
    .add_comment(id, h.alice.user_id, "looks good".into(), None)
    .await
    .unwrap();

  assert_eq!(comment.thread_id, comment.comment_id);
  for user in [&h.owner, &h.bob, &h.fred] {
    let messages = h.messages(user).await;
    let last = messages.last().unwrap();
    assert_eq!(last.title, "New Comment on Widget");
    assert_eq!(last.thread_id, Some(comment.thread_id));
    assert_eq!(h.read(id, user).await, Some(false));
  }
  assert!(!h
    .titles(&h.alice)
    .await
    .contains(&"New Comment on Widget".to_owned()));
  assert_eq!(h.read(id, &h.alice).await, Some(true));

  assert_eq!(h.codes(id).await.last(), Some(&EventCode::CommentAdded));
  let hooks = h.wf.queue().webhooks();
  assert_eq!(hooks.len(), 1);
  assert_eq!(hooks[0].payload["comment"]["body"], "looks good");

  let reply = h
    .wf
    .add_comment(id, h.owner.user_id, "thanks".into(), Some(comment.thread_id))
    .await
    .unwrap();
  assert_eq!(reply.thread_id, comment.thread_id);
  assert_eq!(h.wf.store().comments(id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_comment_is_rejected() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  let err = h
    .wf
    .add_comment(id, h.alice.user_id, "  ".into(), None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn issue_lifecycle() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  let comment = h
    .wf
    .add_comment(id, h.alice.user_id, "the button is off by one".into(), None)
    .await
    .unwrap();

  let issue = h
    .wf
    .create_issue(id, comment.comment_id, h.alice.user_id)
    .await
    .unwrap();
  assert!(!issue.is_resolved());

  let err = h
    .wf
    .create_issue(id, comment.comment_id, h.alice.user_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  let resolved = h
    .wf
    .resolve_issue(issue.issue_id, h.owner.user_id)
    .await
    .unwrap();
  assert_eq!(resolved.resolved_by, Some(h.owner.user_id));
  let err = h
    .wf
    .resolve_issue(issue.issue_id, h.owner.user_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  // Once resolved, the comment can carry a new issue.
  h.wf
    .create_issue(id, comment.comment_id, h.bob.user_id)
    .await
    .unwrap();

  let codes = h.codes(id).await;
  assert_eq!(
    codes.iter().filter(|c| **c == EventCode::IssueCreated).count(),
    2
  );
  assert!(codes.contains(&EventCode::IssueResolved));
}

#[tokio::test]
async fn issue_needs_a_comment_on_the_same_review() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  let other = h.open_review().await;
  let comment = h
    .wf
    .add_comment(other, h.alice.user_id, "elsewhere".into(), None)
    .await
    .unwrap();

  let err = h
    .wf
    .create_issue(id, comment.comment_id, h.alice.user_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::CommentNotFound(_)));

  let err = h
    .wf
    .resolve_issue(Uuid::new_v4(), h.alice.user_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::IssueNotFound(_)));
}

#[tokio::test]
async fn update_publishes_a_revision() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  let carol = h.user("carol").await;

  let update = ReviewUpdate {
    title:       "Widget v2".into(),
    description: "second cut".into(),
    case_link:   String::new(),
    reviewers:   Some(vec![h.alice.user_id, carol.user_id]),
    followers:   None,
  };
  let snap = h
    .wf
    .update_review(id, update, h.owner.user_id)
    .await
    .unwrap();

  assert_eq!(snap.revision.number, 2);
  assert_eq!(snap.review.title, "Widget v2");
  let stored = h.snap(id).await;
  assert_eq!(stored.revision.number, 2);
  assert!(stored.is_reviewer(carol.user_id));
  assert!(!stored.is_reviewer(h.bob.user_id));
  assert_eq!(h.wf.store().revisions(id).await.unwrap().len(), 2);

  assert!(h
    .titles(&h.alice)
    .await
    .contains(&"Update on Review: Widget v2".to_owned()));
  assert!(h
    .titles(&h.bob)
    .await
    .contains(&"Deleted as reviewer on: Widget v2".to_owned()));
  assert!(h.codes(id).await.contains(&EventCode::RevisionAdded));
}

#[tokio::test]
async fn only_owners_update() {
  let h = Harness::new().await;
  let mut input = h.new_review();
  input.draft = true;
  let id = h
    .wf
    .create_review(input, h.owner.user_id)
    .await
    .unwrap()
    .review
    .review_id;
  let update = ReviewUpdate {
    title:       "hijacked".into(),
    description: String::new(),
    case_link:   String::new(),
    reviewers:   None,
    followers:   None,
  };
  let err = h
    .wf
    .update_review(id, update.clone(), h.alice.user_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::PermissionDenied { .. }));

  h.wf
    .transition(id, DemoState::Cancelled, h.owner.user_id)
    .await
    .unwrap();
  let err = h
    .wf
    .update_review(id, update, h.owner.user_id)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn viewing_marks_read_and_stamps_reviewers() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  assert_eq!(h.read(id, &h.alice).await, Some(false));

  h.wf.mark_viewed(id, h.alice.user_id).await.unwrap();

  assert_eq!(h.read(id, &h.alice).await, Some(true));
  let snap = h.snap(id).await;
  assert_eq!(
    snap.reviewer(h.alice.user_id).unwrap().last_viewed,
    Some(monday())
  );
}

#[tokio::test]
async fn bundle_flags() {
  let h = Harness::new().await;
  let id = h.open_review().await;
  let bundle = h
    .wf
    .store()
    .bundles(h.alice.user_id)
    .await
    .unwrap()
    .into_iter()
    .find(|b| b.review_id == Some(id))
    .unwrap();

  h.wf
    .set_bundle_flags(bundle.bundle_id, true, true)
    .await
    .unwrap();
  let bundle = h
    .wf
    .store()
    .bundles(h.alice.user_id)
    .await
    .unwrap()
    .into_iter()
    .find(|b| b.bundle_id == bundle.bundle_id)
    .unwrap();
  assert!(bundle.read && bundle.deleted);

  // A new message revives the bundle.
  h.wf
    .transition(id, DemoState::Paused, h.owner.user_id)
    .await
    .unwrap();
  let bundle = h
    .wf
    .store()
    .bundles(h.alice.user_id)
    .await
    .unwrap()
    .into_iter()
    .find(|b| b.bundle_id == bundle.bundle_id)
    .unwrap();
  assert!(!bundle.read && !bundle.deleted);

  let err = h
    .wf
    .set_bundle_flags(Uuid::new_v4(), true, false)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BundleNotFound(_)));
}
