//! Engine tests against an in-memory `SqliteStore` and a recording queue.

mod comments;
mod reminders;
mod votes;

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use demotime_core::{
  event::EventCode,
  message::Message,
  outbound::RecordingQueue,
  review::ReviewSnapshot,
  store::ReviewStore,
  time::FixedClock,
  user::{NewUser, Project, User},
};
use demotime_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{EngineConfig, NewReview, Workflow};

/// Monday 19 October 2026, 09:00 UTC.
fn monday() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
}

fn day(d: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 10, d, 9, 0, 0).unwrap()
}

struct Harness {
  wf:      Workflow<SqliteStore, RecordingQueue>,
  clock:   Arc<FixedClock>,
  system:  User,
  project: Project,
  owner:   User,
  alice:   User,
  bob:     User,
  fred:    User,
}

impl Harness {
  async fn new() -> Self { Self::build(false).await }

  async fn build(strict_delivery: bool) -> Self {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let system = store.add_user(NewUser::new("system")).await.unwrap();
    let project = store.add_project("Widgets".into()).await.unwrap();
    let mut people = Vec::new();
    for name in ["owner", "alice", "bob", "fred"] {
      let user = store
        .add_user(NewUser::new(name).with_email(format!("{name}@example.com")))
        .await
        .unwrap();
      people.push(user);
    }
    let [owner, alice, bob, fred]: [User; 4] = people.try_into().unwrap();

    let mut config = EngineConfig::new(system.user_id);
    config.strict_delivery = strict_delivery;
    let clock = Arc::new(FixedClock::new(monday()));
    let wf = Workflow::new(store, RecordingQueue::new(), config).with_clock(clock.clone());

    Self { wf, clock, system, project, owner, alice, bob, fred }
  }

  async fn user(&self, name: &str) -> User {
    self
      .wf
      .store()
      .add_user(NewUser::new(name).with_email(format!("{name}@example.com")))
      .await
      .unwrap()
  }

  /// Alice and Bob review, Fred follows.
  fn new_review(&self) -> NewReview {
    NewReview {
      project_id:  self.project.project_id,
      title:       "Widget".into(),
      description: "first cut".into(),
      case_link:   String::new(),
      is_public:   false,
      reviewers:   vec![self.alice.user_id, self.bob.user_id],
      followers:   vec![self.fred.user_id],
      co_owner:    None,
      draft:       false,
    }
  }

  /// Create and open the standard review, then clear the queue.
  async fn open_review(&self) -> Uuid {
    let snap = self
      .wf
      .create_review(self.new_review(), self.owner.user_id)
      .await
      .unwrap();
    self.wf.queue().take();
    snap.review.review_id
  }

  /// The standard review, left in `draft`.
  async fn draft_review(&self) -> Uuid {
    let mut input = self.new_review();
    input.draft = true;
    let snap = self.wf.create_review(input, self.owner.user_id).await.unwrap();
    snap.review.review_id
  }

  async fn snap(&self, review_id: Uuid) -> ReviewSnapshot {
    self.wf.review(review_id).await.unwrap()
  }

  async fn codes(&self, review_id: Uuid) -> Vec<EventCode> {
    self
      .wf
      .events(review_id)
      .await
      .unwrap()
      .into_iter()
      .map(|e| e.code)
      .collect()
  }

  async fn messages(&self, user: &User) -> Vec<Message> {
    let store = self.wf.store();
    let mut out = Vec::new();
    for bundle in store.bundles(user.user_id).await.unwrap() {
      out.extend(store.messages(bundle.bundle_id).await.unwrap());
    }
    out
  }

  async fn titles(&self, user: &User) -> Vec<String> {
    self
      .messages(user)
      .await
      .into_iter()
      .map(|m| m.title)
      .collect()
  }

  async fn read(&self, review_id: Uuid, user: &User) -> Option<bool> {
    self
      .wf
      .store()
      .read_statuses(review_id)
      .await
      .unwrap()
      .into_iter()
      .find(|s| s.user_id == user.user_id)
      .map(|s| s.read)
  }
}
