//! [`SqliteStore`]: the SQLite implementation of [`ReviewStore`].

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use demotime_core::{
  changeset::{ApplyOutcome, Changeset},
  comment::{Comment, Issue},
  event::Event,
  message::{Message, MessageBundle},
  reminder::{DueReminder, Reminder},
  review::{Revision, ReviewSnapshot, UserReviewStatus},
  settings::Setting,
  store::ReviewStore,
  user::{NewUser, Project, User},
  webhook::{Trigger, WebHook},
};
use rusqlite::{ErrorCode, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  Error,
  Result,
  apply::apply_changeset,
  encode::{
    RawBundle,
    RawComment,
    RawEvent,
    RawIssue,
    RawMember,
    RawMessage,
    RawProject,
    RawReadStatus,
    RawReminder,
    RawReview,
    RawReviewer,
    RawRevision,
    RawSetting,
    RawUser,
    RawWebHook,
    decode_uuid,
    encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A DemoTime review store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Every row `load_review` reads, before decoding.
struct RawSnapshot {
  review:    RawReview,
  project:   Option<RawProject>,
  revision:  Option<RawRevision>,
  reviewers: Vec<RawReviewer>,
  followers: Vec<RawMember>,
  creators:  Vec<RawMember>,
  webhooks:  Vec<RawWebHook>,
  users:     Vec<RawUser>,
}

struct RawDue {
  reminder:        RawReminder,
  project_id:      String,
  review_title:    String,
  recipient_email: Option<String>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store. Useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `sql` with a single review-id parameter and collect the rows.
  async fn rows_for<T, F>(&self, sql: String, id: Uuid, map: F) -> Result<Vec<T>>
  where
    T: Send + 'static,
    F: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<T> + Send + 'static,
  {
    let id_str = encode_uuid(id);
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params![id_str], |row| map(row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  /// Run `sql` with a single id parameter and return at most one row.
  async fn row_for<T, F>(&self, sql: String, id: Uuid, map: F) -> Result<Option<T>>
  where
    T: Send + 'static,
    F: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<T> + Send + 'static,
  {
    let id_str = encode_uuid(id);
    let row = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, params![id_str], |row| map(row)).optional()?)
      })
      .await?;
    Ok(row)
  }
}

// ─── ReviewStore impl ────────────────────────────────────────────────────────

impl ReviewStore for SqliteStore {
  type Error = Error;

  // ── Reference data ────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:      Uuid::new_v4(),
      username:     input.username,
      display_name: input.display_name,
      email:        input.email,
      created_at:   Utc::now(),
    };

    let id_str = encode_uuid(user.user_id);
    let username = user.username.clone();
    let display_name = user.display_name.clone();
    let email = user.email.clone();
    let at_str = encode_dt(user.created_at);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO users (user_id, username, display_name, email, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![id_str, username, display_name, email, at_str],
        );
        match result {
          Ok(_) => Ok(true),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation =>
          {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(Error::UsernameTaken(user.username));
    }
    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE user_id = ?1", RawUser::COLUMNS);
    self
      .row_for(sql, id, RawUser::from_row)
      .await?
      .map(RawUser::into_user)
      .transpose()
  }

  async fn find_user<'a>(&'a self, username: &'a str) -> Result<Option<User>> {
    let username = username.to_owned();
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let sql =
          format!("SELECT {} FROM users WHERE username = ?1", RawUser::COLUMNS);
        Ok(
          conn
            .query_row(&sql, params![username], RawUser::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn add_project(&self, name: String) -> Result<Project> {
    let project = Project {
      project_id: Uuid::new_v4(),
      name,
      token: Uuid::new_v4().simple().to_string(),
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(project.project_id);
    let name = project.name.clone();
    let token = project.token.clone();
    let at_str = encode_dt(project.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO projects (project_id, name, token, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          params![id_str, name, token, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(project)
  }

  async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
    let sql = format!(
      "SELECT {} FROM projects WHERE project_id = ?1",
      RawProject::COLUMNS
    );
    self
      .row_for(sql, id, RawProject::from_row)
      .await?
      .map(RawProject::into_project)
      .transpose()
  }

  async fn add_webhook(
    &self,
    project_id: Uuid,
    target: String,
    trigger: Trigger,
  ) -> Result<WebHook> {
    let hook = WebHook {
      webhook_id: Uuid::new_v4(),
      project_id,
      target,
      trigger,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(hook.webhook_id);
    let project_str = encode_uuid(project_id);
    let target = hook.target.clone();
    let at_str = encode_dt(hook.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO webhooks (webhook_id, project_id, target, trigger_event, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![id_str, project_str, target, trigger.name(), at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(hook)
  }

  async fn webhooks(&self, project_id: Uuid) -> Result<Vec<WebHook>> {
    let sql = format!(
      "SELECT {} FROM webhooks WHERE project_id = ?1 ORDER BY created_at, rowid",
      RawWebHook::COLUMNS
    );
    self
      .rows_for(sql, project_id, RawWebHook::from_row)
      .await?
      .into_iter()
      .map(RawWebHook::into_webhook)
      .collect()
  }

  async fn put_setting(&self, setting: Setting) -> Result<()> {
    let project_str = encode_uuid(setting.project_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO settings (project_id, key, raw_value, setting_type, active)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (project_id, key) DO UPDATE
           SET raw_value = excluded.raw_value,
               setting_type = excluded.setting_type,
               active = excluded.active",
          params![
            project_str,
            setting.key,
            setting.raw_value,
            setting.setting_type.name(),
            setting.active,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_setting<'a>(
    &'a self,
    project_id: Uuid,
    key: &'a str,
  ) -> Result<Option<Setting>> {
    let project_str = encode_uuid(project_id);
    let key = key.to_owned();

    let raw: Option<RawSetting> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM settings WHERE project_id = ?1 AND key = ?2",
          RawSetting::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, params![project_str, key], RawSetting::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSetting::into_setting).transpose()
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  async fn load_review(&self, id: Uuid) -> Result<Option<ReviewSnapshot>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSnapshot> = self
      .conn
      .call(move |conn| {
        let review = conn
          .query_row(
            &format!("SELECT {} FROM reviews WHERE review_id = ?1", RawReview::COLUMNS),
            params![id_str],
            RawReview::from_row,
          )
          .optional()?;
        let Some(review) = review else {
          return Ok(None);
        };

        let project = conn
          .query_row(
            &format!(
              "SELECT {} FROM projects WHERE project_id = ?1",
              RawProject::COLUMNS
            ),
            params![review.project_id],
            RawProject::from_row,
          )
          .optional()?;

        let revision = conn
          .query_row(
            &format!(
              "SELECT {} FROM revisions WHERE review_id = ?1
               ORDER BY number DESC LIMIT 1",
              RawRevision::COLUMNS
            ),
            params![id_str],
            RawRevision::from_row,
          )
          .optional()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM reviewers WHERE review_id = ?1 ORDER BY created_at, rowid",
          RawReviewer::COLUMNS
        ))?;
        let reviewers = stmt
          .query_map(params![id_str], RawReviewer::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM followers WHERE review_id = ?1 ORDER BY created_at, rowid",
          RawMember::FOLLOWER_COLUMNS
        ))?;
        let followers = stmt
          .query_map(params![id_str], RawMember::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM creators WHERE review_id = ?1 ORDER BY created_at, rowid",
          RawMember::CREATOR_COLUMNS
        ))?;
        let creators = stmt
          .query_map(params![id_str], RawMember::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM webhooks WHERE project_id = ?1 ORDER BY created_at, rowid",
          RawWebHook::COLUMNS
        ))?;
        let webhooks = stmt
          .query_map(params![review.project_id], RawWebHook::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM users WHERE user_id IN (
             SELECT user_id FROM reviewers WHERE review_id = ?1
             UNION SELECT user_id FROM followers WHERE review_id = ?1
             UNION SELECT user_id FROM creators  WHERE review_id = ?1
           )",
          RawUser::COLUMNS
        ))?;
        let users = stmt
          .query_map(params![id_str], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(RawSnapshot {
          review,
          project,
          revision,
          reviewers,
          followers,
          creators,
          webhooks,
          users,
        }))
      })
      .await?;

    let Some(raw) = raw else {
      return Ok(None);
    };

    let project = raw
      .project
      .ok_or(Error::IncompleteReview(id, "missing project"))?
      .into_project()?;
    let revision = raw
      .revision
      .ok_or(Error::IncompleteReview(id, "missing revision"))?
      .into_revision()?;

    let users = raw
      .users
      .into_iter()
      .map(|u| u.into_user().map(|u| (u.user_id, u)))
      .collect::<Result<BTreeMap<_, _>>>()?;

    Ok(Some(ReviewSnapshot {
      review: raw.review.into_review()?,
      project,
      revision,
      reviewers: raw
        .reviewers
        .into_iter()
        .map(RawReviewer::into_reviewer)
        .collect::<Result<_>>()?,
      followers: raw
        .followers
        .into_iter()
        .map(RawMember::into_follower)
        .collect::<Result<_>>()?,
      creators: raw
        .creators
        .into_iter()
        .map(RawMember::into_creator)
        .collect::<Result<_>>()?,
      webhooks: raw
        .webhooks
        .into_iter()
        .map(RawWebHook::into_webhook)
        .collect::<Result<_>>()?,
      users,
    }))
  }

  async fn apply(&self, changes: Changeset) -> Result<ApplyOutcome> {
    if changes.is_empty() {
      return Ok(ApplyOutcome::Committed);
    }
    let outcome = self
      .conn
      .call(move |conn| Ok(apply_changeset(conn, changes)?))
      .await?;
    Ok(outcome)
  }

  async fn due_reminders(&self, now: DateTime<Utc>) -> Result<Vec<DueReminder>> {
    let now_str = encode_dt(now);

    let raws: Vec<RawDue> = self
      .conn
      .call(move |conn| {
        // Reminder columns are qualified so the join stays unambiguous.
        let columns = RawReminder::COLUMNS
          .split(", ")
          .map(|c| format!("m.{c}"))
          .collect::<Vec<_>>()
          .join(", ");
        let mut stmt = conn.prepare(&format!(
          "SELECT {columns}, r.project_id, r.title, u.email
           FROM reminders m
           JOIN reviews r ON r.review_id = m.review_id
           LEFT JOIN users u ON u.user_id = m.user_id
           WHERE m.active = 1 AND m.remind_at <= ?1
           ORDER BY m.remind_at, m.rowid"
        ))?;
        let rows = stmt
          .query_map(params![now_str], |row| {
            Ok(RawDue {
              reminder:        RawReminder::from_row(row)?,
              project_id:      row.get(8)?,
              review_title:    row.get(9)?,
              recipient_email: row.get(10)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|raw| {
        Ok(DueReminder {
          reminder:        raw.reminder.into_reminder()?,
          project_id:      decode_uuid(&raw.project_id)?,
          review_title:    raw.review_title,
          recipient_email: raw.recipient_email,
        })
      })
      .collect()
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn reminders(&self, review_id: Uuid) -> Result<Vec<Reminder>> {
    let sql = format!(
      "SELECT {} FROM reminders WHERE review_id = ?1 ORDER BY created_at, rowid",
      RawReminder::COLUMNS
    );
    self
      .rows_for(sql, review_id, RawReminder::from_row)
      .await?
      .into_iter()
      .map(RawReminder::into_reminder)
      .collect()
  }

  async fn events(&self, review_id: Uuid) -> Result<Vec<Event>> {
    let sql = format!(
      "SELECT {} FROM events WHERE review_id = ?1 ORDER BY created_at, rowid",
      RawEvent::COLUMNS
    );
    self
      .rows_for(sql, review_id, RawEvent::from_row)
      .await?
      .into_iter()
      .map(RawEvent::into_event)
      .collect()
  }

  async fn read_statuses(&self, review_id: Uuid) -> Result<Vec<UserReviewStatus>> {
    let sql = format!(
      "SELECT {} FROM user_review_status WHERE review_id = ?1 ORDER BY rowid",
      RawReadStatus::COLUMNS
    );
    self
      .rows_for(sql, review_id, RawReadStatus::from_row)
      .await?
      .into_iter()
      .map(RawReadStatus::into_status)
      .collect()
  }

  async fn revisions(&self, review_id: Uuid) -> Result<Vec<Revision>> {
    let sql = format!(
      "SELECT {} FROM revisions WHERE review_id = ?1 ORDER BY number",
      RawRevision::COLUMNS
    );
    self
      .rows_for(sql, review_id, RawRevision::from_row)
      .await?
      .into_iter()
      .map(RawRevision::into_revision)
      .collect()
  }

  async fn comments(&self, review_id: Uuid) -> Result<Vec<Comment>> {
    let sql = format!(
      "SELECT {} FROM comments WHERE review_id = ?1 ORDER BY created_at, rowid",
      RawComment::COLUMNS
    );
    self
      .rows_for(sql, review_id, RawComment::from_row)
      .await?
      .into_iter()
      .map(RawComment::into_comment)
      .collect()
  }

  async fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
    let sql = format!(
      "SELECT {} FROM comments WHERE comment_id = ?1",
      RawComment::COLUMNS
    );
    self
      .row_for(sql, id, RawComment::from_row)
      .await?
      .map(RawComment::into_comment)
      .transpose()
  }

  async fn issues(&self, review_id: Uuid) -> Result<Vec<Issue>> {
    let sql = format!(
      "SELECT {} FROM issues WHERE review_id = ?1 ORDER BY created_at, rowid",
      RawIssue::COLUMNS
    );
    self
      .rows_for(sql, review_id, RawIssue::from_row)
      .await?
      .into_iter()
      .map(RawIssue::into_issue)
      .collect()
  }

  async fn get_issue(&self, id: Uuid) -> Result<Option<Issue>> {
    let sql =
      format!("SELECT {} FROM issues WHERE issue_id = ?1", RawIssue::COLUMNS);
    self
      .row_for(sql, id, RawIssue::from_row)
      .await?
      .map(RawIssue::into_issue)
      .transpose()
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn bundles(&self, owner_id: Uuid) -> Result<Vec<MessageBundle>> {
    let sql = format!(
      "SELECT {} FROM bundles WHERE owner_id = ?1
       ORDER BY modified_at DESC, rowid DESC",
      RawBundle::COLUMNS
    );
    self
      .rows_for(sql, owner_id, RawBundle::from_row)
      .await?
      .into_iter()
      .map(RawBundle::into_bundle)
      .collect()
  }

  async fn messages(&self, bundle_id: Uuid) -> Result<Vec<Message>> {
    let sql = format!(
      "SELECT {} FROM messages WHERE bundle_id = ?1 ORDER BY created_at, rowid",
      RawMessage::COLUMNS
    );
    self
      .rows_for(sql, bundle_id, RawMessage::from_row)
      .await?
      .into_iter()
      .map(RawMessage::into_message)
      .collect()
  }

  async fn set_bundle_flags(
    &self,
    bundle_id: Uuid,
    read: bool,
    deleted: bool,
  ) -> Result<bool> {
    let id_str = encode_uuid(bundle_id);
    let at_str = encode_dt(Utc::now());

    let n: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE bundles SET read = ?2, deleted = ?3, modified_at = ?4
           WHERE bundle_id = ?1",
          params![id_str, read, deleted, at_str],
        )?)
      })
      .await?;
    Ok(n == 1)
  }
}
