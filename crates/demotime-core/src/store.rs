//! The `ReviewStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `demotime-store-sqlite`). The workflow engine and the HTTP layer depend on
//! this abstraction, not on any concrete backend.
//!
//! Review mutations go through a single entry point, [`ReviewStore::apply`],
//! which takes a [`Changeset`] and applies it atomically. The remaining write
//! methods cover reference data (users, projects, webhooks, settings) and the
//! owner-driven bundle flags.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  changeset::{ApplyOutcome, Changeset},
  comment::{Comment, Issue},
  event::Event,
  message::{Message, MessageBundle},
  reminder::{DueReminder, Reminder},
  review::{Revision, ReviewSnapshot, UserReviewStatus},
  settings::Setting,
  user::{NewUser, Project, User},
  webhook::{Trigger, WebHook},
};

/// Abstraction over a DemoTime store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ReviewStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reference data ────────────────────────────────────────────────────

  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Create a project with a freshly generated webhook token.
  fn add_project(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;

  fn get_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  fn add_webhook(
    &self,
    project_id: Uuid,
    target: String,
    trigger: Trigger,
  ) -> impl Future<Output = Result<WebHook, Self::Error>> + Send + '_;

  /// Webhooks registered on a project, oldest first.
  fn webhooks(
    &self,
    project_id: Uuid,
  ) -> impl Future<Output = Result<Vec<WebHook>, Self::Error>> + Send + '_;

  /// Insert or replace the setting for (project, key).
  fn put_setting(
    &self,
    setting: Setting,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_setting<'a>(
    &'a self,
    project_id: Uuid,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Setting>, Self::Error>> + Send + 'a;

  // ── Reviews ───────────────────────────────────────────────────────────

  /// Load the full aggregate for a review. Returns `None` if not found.
  fn load_review(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ReviewSnapshot>, Self::Error>> + Send + '_;

  /// Apply every mutation in `changes` inside one transaction.
  ///
  /// Returns [`ApplyOutcome::Conflict`] (and writes nothing) when a
  /// compare-and-set mutation finds the stored value has moved on.
  fn apply(
    &self,
    changes: Changeset,
  ) -> impl Future<Output = Result<ApplyOutcome, Self::Error>> + Send + '_;

  /// Every active reminder with `remind_at <= now`.
  fn due_reminders(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<DueReminder>, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn reminders(
    &self,
    review_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Reminder>, Self::Error>> + Send + '_;

  /// Events for a review, oldest first.
  fn events(
    &self,
    review_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  fn read_statuses(
    &self,
    review_id: Uuid,
  ) -> impl Future<Output = Result<Vec<UserReviewStatus>, Self::Error>> + Send + '_;

  /// Revisions for a review, oldest first.
  fn revisions(
    &self,
    review_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Revision>, Self::Error>> + Send + '_;

  /// Comments for a review, oldest first.
  fn comments(
    &self,
    review_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  fn get_comment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Comment>, Self::Error>> + Send + '_;

  fn issues(
    &self,
    review_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Issue>, Self::Error>> + Send + '_;

  fn get_issue(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Issue>, Self::Error>> + Send + '_;

  // ── Messages ──────────────────────────────────────────────────────────

  /// Bundles owned by a user, most recently modified first.
  fn bundles(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Vec<MessageBundle>, Self::Error>> + Send + '_;

  /// Messages in a bundle, oldest first.
  fn messages(
    &self,
    bundle_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// Owner-driven read/delete flags. Returns `false` if the bundle does not
  /// exist.
  fn set_bundle_flags(
    &self,
    bundle_id: Uuid,
    read: bool,
    deleted: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
