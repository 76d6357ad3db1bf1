//! Translation of [`Mutation`]s into SQL, run inside one transaction.
//!
//! Each mutation returns `false` when a compare-and-set guard fails; the
//! caller then drops the transaction, which rolls every earlier statement
//! back.

use demotime_core::{
  changeset::{ApplyOutcome, Changeset, Mutation, ReadScope},
  message::NewMessage,
  state::ReviewerState,
};
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::encode::{encode_dt, encode_opt_uuid, encode_uuid};

pub fn apply_changeset(
  conn: &mut Connection,
  changes: Changeset,
) -> rusqlite::Result<ApplyOutcome> {
  let tx = conn.transaction()?;
  for mutation in changes {
    if !apply_one(&tx, mutation)? {
      return Ok(ApplyOutcome::Conflict);
    }
  }
  tx.commit()?;
  Ok(ApplyOutcome::Committed)
}

fn apply_one(conn: &Connection, mutation: Mutation) -> rusqlite::Result<bool> {
  match mutation {
    // ── Review ─────────────────────────────────────────────────────────────
    Mutation::InsertReview(r) => {
      conn.execute(
        "INSERT INTO reviews (
           review_id, project_id, title, description, case_link,
           demo_state, reviewer_state, is_public, created_at, modified_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
          encode_uuid(r.review_id),
          encode_uuid(r.project_id),
          r.title,
          r.description,
          r.case_link,
          r.demo_state.name(),
          r.reviewer_state.name(),
          r.is_public,
          encode_dt(r.created_at),
          encode_dt(r.modified_at),
        ],
      )?;
    }
    Mutation::UpdateReviewDetails { review_id, title, description, case_link, at } => {
      conn.execute(
        "UPDATE reviews
         SET title = ?2, description = ?3, case_link = ?4, modified_at = ?5
         WHERE review_id = ?1",
        params![encode_uuid(review_id), title, description, case_link, encode_dt(at)],
      )?;
    }
    Mutation::SetDemoState { review_id, from, to, at } => {
      let n = conn.execute(
        "UPDATE reviews SET demo_state = ?3, modified_at = ?4
         WHERE review_id = ?1 AND demo_state = ?2",
        params![encode_uuid(review_id), from.name(), to.name(), encode_dt(at)],
      )?;
      return Ok(n == 1);
    }
    Mutation::SetReviewerState { review_id, from, to, at } => {
      let n = conn.execute(
        "UPDATE reviews SET reviewer_state = ?3, modified_at = ?4
         WHERE review_id = ?1 AND reviewer_state = ?2",
        params![encode_uuid(review_id), from.name(), to.name(), encode_dt(at)],
      )?;
      return Ok(n == 1);
    }
    Mutation::InsertRevision(rev) => {
      conn.execute(
        "INSERT INTO revisions (revision_id, review_id, number, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
          encode_uuid(rev.revision_id),
          encode_uuid(rev.review_id),
          rev.number,
          rev.description,
          encode_dt(rev.created_at),
        ],
      )?;
    }

    // ── Participants ───────────────────────────────────────────────────────
    Mutation::UpsertReviewer(r) => {
      conn.execute(
        "INSERT INTO reviewers (
           reviewer_id, review_id, user_id, status, is_active,
           last_viewed, created_at, modified_at
         ) VALUES (?1, ?2, ?3, ?4, 1, NULL, ?5, ?6)
         ON CONFLICT (review_id, user_id) DO UPDATE
         SET status = excluded.status, is_active = 1,
             modified_at = excluded.modified_at",
        params![
          encode_uuid(r.reviewer_id),
          encode_uuid(r.review_id),
          encode_uuid(r.user_id),
          r.status.name(),
          encode_dt(r.created_at),
          encode_dt(r.modified_at),
        ],
      )?;
    }
    Mutation::SetReviewerStatus { review_id, user_id, status, at } => {
      conn.execute(
        "UPDATE reviewers SET status = ?3, modified_at = ?4
         WHERE review_id = ?1 AND user_id = ?2",
        params![
          encode_uuid(review_id),
          encode_uuid(user_id),
          status.name(),
          encode_dt(at)
        ],
      )?;
    }
    Mutation::ResetReviewerVotes { review_id, at } => {
      conn.execute(
        "UPDATE reviewers SET status = ?2, modified_at = ?3
         WHERE review_id = ?1 AND is_active = 1",
        params![
          encode_uuid(review_id),
          ReviewerState::Reviewing.name(),
          encode_dt(at)
        ],
      )?;
    }
    Mutation::DeactivateReviewer { review_id, user_id, at } => {
      conn.execute(
        "UPDATE reviewers SET is_active = 0, status = ?3, modified_at = ?4
         WHERE review_id = ?1 AND user_id = ?2",
        params![
          encode_uuid(review_id),
          encode_uuid(user_id),
          ReviewerState::Reviewing.name(),
          encode_dt(at)
        ],
      )?;
    }
    Mutation::StampReviewerViewed { review_id, user_id, at } => {
      conn.execute(
        "UPDATE reviewers SET last_viewed = ?3
         WHERE review_id = ?1 AND user_id = ?2",
        params![encode_uuid(review_id), encode_uuid(user_id), encode_dt(at)],
      )?;
    }
    Mutation::UpsertFollower(f) => {
      upsert_member(
        conn,
        "followers",
        "follower_id",
        f.follower_id,
        f.review_id,
        f.user_id,
        f.created_at,
        f.modified_at,
      )?;
    }
    Mutation::DeactivateFollower { review_id, user_id, at } => {
      deactivate_member(conn, "followers", review_id, user_id, at)?;
    }
    Mutation::UpsertCreator(c) => {
      upsert_member(
        conn,
        "creators",
        "creator_id",
        c.creator_id,
        c.review_id,
        c.user_id,
        c.created_at,
        c.modified_at,
      )?;
    }
    Mutation::DeactivateCreator { review_id, user_id, at } => {
      deactivate_member(conn, "creators", review_id, user_id, at)?;
    }
    Mutation::TouchParticipants { review_id, at } => {
      let (id, at) = (encode_uuid(review_id), encode_dt(at));
      conn.execute(
        "UPDATE reviewers SET modified_at = ?2 WHERE review_id = ?1 AND is_active = 1",
        params![id, at],
      )?;
      conn.execute(
        "UPDATE followers SET modified_at = ?2 WHERE review_id = ?1 AND is_active = 1",
        params![id, at],
      )?;
    }

    // ── Read status ────────────────────────────────────────────────────────
    Mutation::SetReadStatus { review_id, user_id, read, at } => {
      conn.execute(
        "INSERT INTO user_review_status (review_id, user_id, read, modified_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (review_id, user_id) DO UPDATE
         SET read = excluded.read, modified_at = excluded.modified_at",
        params![encode_uuid(review_id), encode_uuid(user_id), read, encode_dt(at)],
      )?;
    }
    Mutation::EnsureReadStatus { review_id, user_id, at } => {
      conn.execute(
        "INSERT OR IGNORE INTO user_review_status (review_id, user_id, read, modified_at)
         VALUES (?1, ?2, 0, ?3)",
        params![encode_uuid(review_id), encode_uuid(user_id), encode_dt(at)],
      )?;
    }
    Mutation::MarkUnread { review_id, scope, at } => {
      let sql = match scope {
        ReadScope::AllExcept(_) => {
          "UPDATE user_review_status SET read = 0, modified_at = ?3
           WHERE review_id = ?1 AND user_id != ?2"
        }
        ReadScope::Only(_) => {
          "UPDATE user_review_status SET read = 0, modified_at = ?3
           WHERE review_id = ?1 AND user_id = ?2"
        }
      };
      let user_id = match scope {
        ReadScope::AllExcept(u) | ReadScope::Only(u) => u,
      };
      conn.execute(
        sql,
        params![encode_uuid(review_id), encode_uuid(user_id), encode_dt(at)],
      )?;
    }

    // ── Messages ───────────────────────────────────────────────────────────
    Mutation::AppendMessage(msg) => append_message(conn, msg)?,

    // ── Reminders ──────────────────────────────────────────────────────────
    Mutation::EnsureReminder(r) => {
      conn.execute(
        "INSERT OR IGNORE INTO reminders (
           reminder_id, review_id, user_id, kind, remind_at,
           active, created_at, modified_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
          encode_uuid(r.reminder_id),
          encode_uuid(r.review_id),
          encode_uuid(r.user_id),
          r.kind.name(),
          encode_dt(r.remind_at),
          r.active,
          encode_dt(r.created_at),
          encode_dt(r.modified_at),
        ],
      )?;
    }
    Mutation::SetReminderActive { review_id, user_id, active, remind_at, at } => {
      // `?2 IS NULL` selects every reminder of the review; `?4 IS NULL`
      // keeps the stored due date.
      conn.execute(
        "UPDATE reminders
         SET active = ?3, remind_at = COALESCE(?4, remind_at), modified_at = ?5
         WHERE review_id = ?1 AND (?2 IS NULL OR user_id = ?2)",
        params![
          encode_uuid(review_id),
          encode_opt_uuid(user_id),
          active,
          remind_at.map(encode_dt),
          encode_dt(at),
        ],
      )?;
    }
    Mutation::RescheduleReminder { reminder_id, expected, remind_at, at } => {
      let n = conn.execute(
        "UPDATE reminders SET remind_at = ?3, modified_at = ?4
         WHERE reminder_id = ?1 AND remind_at = ?2 AND active = 1",
        params![
          encode_uuid(reminder_id),
          encode_dt(expected),
          encode_dt(remind_at),
          encode_dt(at),
        ],
      )?;
      return Ok(n == 1);
    }
    Mutation::DeleteReminder { review_id, user_id } => {
      conn.execute(
        "DELETE FROM reminders WHERE review_id = ?1 AND user_id = ?2",
        params![encode_uuid(review_id), encode_uuid(user_id)],
      )?;
    }

    // ── Log, comments, issues ──────────────────────────────────────────────
    Mutation::InsertEvent(e) => {
      conn.execute(
        "INSERT INTO events (
           event_id, project_id, review_id, code, related_type,
           related_id, user_id, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
          encode_uuid(e.event_id),
          encode_uuid(e.project_id),
          encode_uuid(e.review_id),
          e.code.code(),
          e.related_type.name(),
          encode_uuid(e.related_id),
          encode_uuid(e.user_id),
          encode_dt(e.created_at),
        ],
      )?;
    }
    Mutation::InsertComment(c) => {
      conn.execute(
        "INSERT INTO comments (
           comment_id, review_id, revision_id, thread_id,
           commenter_id, body, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
          encode_uuid(c.comment_id),
          encode_uuid(c.review_id),
          encode_uuid(c.revision_id),
          encode_uuid(c.thread_id),
          encode_uuid(c.commenter_id),
          c.body,
          encode_dt(c.created_at),
        ],
      )?;
    }
    Mutation::InsertIssue(i) => {
      // The partial unique index rejects a second open issue; treat that as a
      // lost race rather than a database failure.
      let n = conn.execute(
        "INSERT OR IGNORE INTO issues (
           issue_id, review_id, comment_id, created_by,
           resolved_by, created_at, modified_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
          encode_uuid(i.issue_id),
          encode_uuid(i.review_id),
          encode_uuid(i.comment_id),
          encode_uuid(i.created_by),
          encode_opt_uuid(i.resolved_by),
          encode_dt(i.created_at),
          encode_dt(i.modified_at),
        ],
      )?;
      return Ok(n == 1);
    }
    Mutation::ResolveIssue { issue_id, resolved_by, at } => {
      let n = conn.execute(
        "UPDATE issues SET resolved_by = ?2, modified_at = ?3
         WHERE issue_id = ?1 AND resolved_by IS NULL",
        params![encode_uuid(issue_id), encode_uuid(resolved_by), encode_dt(at)],
      )?;
      return Ok(n == 1);
    }
  }
  Ok(true)
}

#[allow(clippy::too_many_arguments)]
fn upsert_member(
  conn: &Connection,
  table: &str,
  id_column: &str,
  id: Uuid,
  review_id: Uuid,
  user_id: Uuid,
  created_at: chrono::DateTime<chrono::Utc>,
  modified_at: chrono::DateTime<chrono::Utc>,
) -> rusqlite::Result<()> {
  let sql = format!(
    "INSERT INTO {table} ({id_column}, review_id, user_id, is_active, created_at, modified_at)
     VALUES (?1, ?2, ?3, 1, ?4, ?5)
     ON CONFLICT (review_id, user_id) DO UPDATE
     SET is_active = 1, modified_at = excluded.modified_at"
  );
  conn.execute(
    &sql,
    params![
      encode_uuid(id),
      encode_uuid(review_id),
      encode_uuid(user_id),
      encode_dt(created_at),
      encode_dt(modified_at),
    ],
  )?;
  Ok(())
}

fn deactivate_member(
  conn: &Connection,
  table: &str,
  review_id: Uuid,
  user_id: Uuid,
  at: chrono::DateTime<chrono::Utc>,
) -> rusqlite::Result<()> {
  let sql = format!(
    "UPDATE {table} SET is_active = 0, modified_at = ?3
     WHERE review_id = ?1 AND user_id = ?2"
  );
  conn.execute(
    &sql,
    params![encode_uuid(review_id), encode_uuid(user_id), encode_dt(at)],
  )?;
  Ok(())
}

/// Get-or-create the bundle for (review-or-none, recipient), revive it, and
/// append the message.
fn append_message(conn: &Connection, msg: NewMessage) -> rusqlite::Result<()> {
  let review_id = encode_opt_uuid(msg.review_id);
  let owner_id = encode_uuid(msg.recipient_id);
  let at = encode_dt(msg.created_at);

  let existing: Option<String> = conn
    .query_row(
      "SELECT bundle_id FROM bundles WHERE review_id IS ?1 AND owner_id = ?2",
      params![review_id, owner_id],
      |row| row.get(0),
    )
    .optional()?;

  let bundle_id = match existing {
    Some(id) => {
      conn.execute(
        "UPDATE bundles SET read = 0, deleted = 0, modified_at = ?2
         WHERE bundle_id = ?1",
        params![id, at],
      )?;
      id
    }
    None => {
      let id = encode_uuid(Uuid::new_v4());
      conn.execute(
        "INSERT INTO bundles (bundle_id, review_id, owner_id, read, deleted, created_at, modified_at)
         VALUES (?1, ?2, ?3, 0, 0, ?4, ?4)",
        params![id, review_id, owner_id, at],
      )?;
      id
    }
  };

  conn.execute(
    "INSERT INTO messages (
       message_id, bundle_id, recipient_id, sender_id, review_id,
       revision_id, thread_id, title, template, context, body, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    params![
      encode_uuid(msg.message_id),
      bundle_id,
      owner_id,
      encode_uuid(msg.sender_id),
      review_id,
      encode_opt_uuid(msg.revision_id),
      encode_opt_uuid(msg.thread_id),
      msg.title,
      msg.template.name(),
      msg.context.to_string(),
      msg.body,
      at,
    ],
  )?;
  Ok(())
}
