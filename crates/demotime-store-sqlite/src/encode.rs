//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical order equals chronological order and
//! `remind_at <= ?` comparisons work in SQL. UUIDs are stored as hyphenated
//! lowercase strings. Enums are stored by their symbolic name.

use chrono::{DateTime, SecondsFormat, Utc};
use demotime_core::{
  comment::{Comment, Issue},
  event::{Event, EventCode, RelatedType},
  message::{Message, MessageBundle, MessageTemplate},
  reminder::{Reminder, ReminderKind},
  review::{Creator, Follower, Review, Reviewer, Revision, UserReviewStatus},
  settings::{Setting, SettingType},
  state::{DemoState, ReviewerState},
  user::{Project, User},
  webhook::{Trigger, WebHook},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_opt_uuid(id: Option<Uuid>) -> Option<String> {
  id.map(encode_uuid)
}

pub fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────
//
// Each `Raw*` struct holds the strings read directly from one row. The
// `COLUMNS` constant lists the select order that `from_row` expects.

pub struct RawUser {
  pub user_id:      String,
  pub username:     String,
  pub display_name: Option<String>,
  pub email:        Option<String>,
  pub created_at:   String,
}

impl RawUser {
  pub const COLUMNS: &'static str = "user_id, username, display_name, email, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:      row.get(0)?,
      username:     row.get(1)?,
      display_name: row.get(2)?,
      email:        row.get(3)?,
      created_at:   row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:      decode_uuid(&self.user_id)?,
      username:     self.username,
      display_name: self.display_name,
      email:        self.email,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawProject {
  pub project_id: String,
  pub name:       String,
  pub token:      String,
  pub created_at: String,
}

impl RawProject {
  pub const COLUMNS: &'static str = "project_id, name, token, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      project_id: row.get(0)?,
      name:       row.get(1)?,
      token:      row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_project(self) -> Result<Project> {
    Ok(Project {
      project_id: decode_uuid(&self.project_id)?,
      name:       self.name,
      token:      self.token,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawSetting {
  pub project_id:   String,
  pub key:          String,
  pub raw_value:    String,
  pub setting_type: String,
  pub active:       bool,
}

impl RawSetting {
  pub const COLUMNS: &'static str = "project_id, key, raw_value, setting_type, active";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      project_id:   row.get(0)?,
      key:          row.get(1)?,
      raw_value:    row.get(2)?,
      setting_type: row.get(3)?,
      active:       row.get(4)?,
    })
  }

  pub fn into_setting(self) -> Result<Setting> {
    Ok(Setting {
      project_id:   decode_uuid(&self.project_id)?,
      key:          self.key,
      raw_value:    self.raw_value,
      setting_type: SettingType::from_name(&self.setting_type)?,
      active:       self.active,
    })
  }
}

pub struct RawWebHook {
  pub webhook_id: String,
  pub project_id: String,
  pub target:     String,
  pub trigger:    String,
  pub created_at: String,
}

impl RawWebHook {
  pub const COLUMNS: &'static str =
    "webhook_id, project_id, target, trigger_event, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      webhook_id: row.get(0)?,
      project_id: row.get(1)?,
      target:     row.get(2)?,
      trigger:    row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_webhook(self) -> Result<WebHook> {
    Ok(WebHook {
      webhook_id: decode_uuid(&self.webhook_id)?,
      project_id: decode_uuid(&self.project_id)?,
      target:     self.target,
      trigger:    Trigger::from_name(&self.trigger)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawReview {
  pub review_id:      String,
  pub project_id:     String,
  pub title:          String,
  pub description:    String,
  pub case_link:      String,
  pub demo_state:     String,
  pub reviewer_state: String,
  pub is_public:      bool,
  pub created_at:     String,
  pub modified_at:    String,
}

impl RawReview {
  pub const COLUMNS: &'static str = "review_id, project_id, title, description, \
                             case_link, demo_state, reviewer_state, \
                             is_public, created_at, modified_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      review_id:      row.get(0)?,
      project_id:     row.get(1)?,
      title:          row.get(2)?,
      description:    row.get(3)?,
      case_link:      row.get(4)?,
      demo_state:     row.get(5)?,
      reviewer_state: row.get(6)?,
      is_public:      row.get(7)?,
      created_at:     row.get(8)?,
      modified_at:    row.get(9)?,
    })
  }

  pub fn into_review(self) -> Result<Review> {
    Ok(Review {
      review_id:      decode_uuid(&self.review_id)?,
      project_id:     decode_uuid(&self.project_id)?,
      title:          self.title,
      description:    self.description,
      case_link:      self.case_link,
      demo_state:     DemoState::from_name(&self.demo_state)?,
      reviewer_state: ReviewerState::from_name(&self.reviewer_state)?,
      is_public:      self.is_public,
      created_at:     decode_dt(&self.created_at)?,
      modified_at:    decode_dt(&self.modified_at)?,
    })
  }
}

pub struct RawRevision {
  pub revision_id: String,
  pub review_id:   String,
  pub number:      u32,
  pub description: String,
  pub created_at:  String,
}

impl RawRevision {
  pub const COLUMNS: &'static str =
    "revision_id, review_id, number, description, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      revision_id: row.get(0)?,
      review_id:   row.get(1)?,
      number:      row.get(2)?,
      description: row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn into_revision(self) -> Result<Revision> {
    Ok(Revision {
      revision_id: decode_uuid(&self.revision_id)?,
      review_id:   decode_uuid(&self.review_id)?,
      number:      self.number,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawReviewer {
  pub reviewer_id: String,
  pub review_id:   String,
  pub user_id:     String,
  pub status:      String,
  pub is_active:   bool,
  pub last_viewed: Option<String>,
  pub created_at:  String,
  pub modified_at: String,
}

impl RawReviewer {
  pub const COLUMNS: &'static str = "reviewer_id, review_id, user_id, status, \
                             is_active, last_viewed, created_at, modified_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      reviewer_id: row.get(0)?,
      review_id:   row.get(1)?,
      user_id:     row.get(2)?,
      status:      row.get(3)?,
      is_active:   row.get(4)?,
      last_viewed: row.get(5)?,
      created_at:  row.get(6)?,
      modified_at: row.get(7)?,
    })
  }

  pub fn into_reviewer(self) -> Result<Reviewer> {
    Ok(Reviewer {
      reviewer_id: decode_uuid(&self.reviewer_id)?,
      review_id:   decode_uuid(&self.review_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      status:      ReviewerState::from_name(&self.status)?,
      is_active:   self.is_active,
      last_viewed: self.last_viewed.as_deref().map(decode_dt).transpose()?,
      created_at:  decode_dt(&self.created_at)?,
      modified_at: decode_dt(&self.modified_at)?,
    })
  }
}

/// Followers and creators share a column layout.
pub struct RawMember {
  pub member_id:   String,
  pub review_id:   String,
  pub user_id:     String,
  pub is_active:   bool,
  pub created_at:  String,
  pub modified_at: String,
}

impl RawMember {
  pub const FOLLOWER_COLUMNS: &'static str =
    "follower_id, review_id, user_id, is_active, created_at, modified_at";
  pub const CREATOR_COLUMNS: &'static str =
    "creator_id, review_id, user_id, is_active, created_at, modified_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      member_id:   row.get(0)?,
      review_id:   row.get(1)?,
      user_id:     row.get(2)?,
      is_active:   row.get(3)?,
      created_at:  row.get(4)?,
      modified_at: row.get(5)?,
    })
  }

  pub fn into_follower(self) -> Result<Follower> {
    Ok(Follower {
      follower_id: decode_uuid(&self.member_id)?,
      review_id:   decode_uuid(&self.review_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      is_active:   self.is_active,
      created_at:  decode_dt(&self.created_at)?,
      modified_at: decode_dt(&self.modified_at)?,
    })
  }

  pub fn into_creator(self) -> Result<Creator> {
    Ok(Creator {
      creator_id:  decode_uuid(&self.member_id)?,
      review_id:   decode_uuid(&self.review_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      is_active:   self.is_active,
      created_at:  decode_dt(&self.created_at)?,
      modified_at: decode_dt(&self.modified_at)?,
    })
  }
}

pub struct RawReadStatus {
  pub review_id:   String,
  pub user_id:     String,
  pub read:        bool,
  pub modified_at: String,
}

impl RawReadStatus {
  pub const COLUMNS: &'static str = "review_id, user_id, read, modified_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      review_id:   row.get(0)?,
      user_id:     row.get(1)?,
      read:        row.get(2)?,
      modified_at: row.get(3)?,
    })
  }

  pub fn into_status(self) -> Result<UserReviewStatus> {
    Ok(UserReviewStatus {
      review_id:   decode_uuid(&self.review_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      read:        self.read,
      modified_at: decode_dt(&self.modified_at)?,
    })
  }
}

pub struct RawBundle {
  pub bundle_id:   String,
  pub review_id:   Option<String>,
  pub owner_id:    String,
  pub read:        bool,
  pub deleted:     bool,
  pub created_at:  String,
  pub modified_at: String,
}

impl RawBundle {
  pub const COLUMNS: &'static str =
    "bundle_id, review_id, owner_id, read, deleted, created_at, modified_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      bundle_id:   row.get(0)?,
      review_id:   row.get(1)?,
      owner_id:    row.get(2)?,
      read:        row.get(3)?,
      deleted:     row.get(4)?,
      created_at:  row.get(5)?,
      modified_at: row.get(6)?,
    })
  }

  pub fn into_bundle(self) -> Result<MessageBundle> {
    Ok(MessageBundle {
      bundle_id:   decode_uuid(&self.bundle_id)?,
      review_id:   decode_opt_uuid(self.review_id.as_deref())?,
      owner_id:    decode_uuid(&self.owner_id)?,
      read:        self.read,
      deleted:     self.deleted,
      created_at:  decode_dt(&self.created_at)?,
      modified_at: decode_dt(&self.modified_at)?,
    })
  }
}

pub struct RawMessage {
  pub message_id:   String,
  pub bundle_id:    String,
  pub recipient_id: String,
  pub sender_id:    String,
  pub review_id:    Option<String>,
  pub revision_id:  Option<String>,
  pub thread_id:    Option<String>,
  pub title:        String,
  pub template:     String,
  pub context:      String,
  pub body:         String,
  pub created_at:   String,
}

impl RawMessage {
  pub const COLUMNS: &'static str = "message_id, bundle_id, recipient_id, sender_id, \
                             review_id, revision_id, thread_id, title, \
                             template, context, body, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:   row.get(0)?,
      bundle_id:    row.get(1)?,
      recipient_id: row.get(2)?,
      sender_id:    row.get(3)?,
      review_id:    row.get(4)?,
      revision_id:  row.get(5)?,
      thread_id:    row.get(6)?,
      title:        row.get(7)?,
      template:     row.get(8)?,
      context:      row.get(9)?,
      body:         row.get(10)?,
      created_at:   row.get(11)?,
    })
  }

  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      message_id:   decode_uuid(&self.message_id)?,
      bundle_id:    decode_uuid(&self.bundle_id)?,
      recipient_id: decode_uuid(&self.recipient_id)?,
      sender_id:    decode_uuid(&self.sender_id)?,
      review_id:    decode_opt_uuid(self.review_id.as_deref())?,
      revision_id:  decode_opt_uuid(self.revision_id.as_deref())?,
      thread_id:    decode_opt_uuid(self.thread_id.as_deref())?,
      title:        self.title,
      template:     MessageTemplate::from_name(&self.template)?,
      context:      serde_json::from_str(&self.context)?,
      body:         self.body,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawReminder {
  pub reminder_id: String,
  pub review_id:   String,
  pub user_id:     String,
  pub kind:        String,
  pub remind_at:   String,
  pub active:      bool,
  pub created_at:  String,
  pub modified_at: String,
}

impl RawReminder {
  pub const COLUMNS: &'static str = "reminder_id, review_id, user_id, kind, \
                             remind_at, active, created_at, modified_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      reminder_id: row.get(0)?,
      review_id:   row.get(1)?,
      user_id:     row.get(2)?,
      kind:        row.get(3)?,
      remind_at:   row.get(4)?,
      active:      row.get(5)?,
      created_at:  row.get(6)?,
      modified_at: row.get(7)?,
    })
  }

  pub fn into_reminder(self) -> Result<Reminder> {
    Ok(Reminder {
      reminder_id: decode_uuid(&self.reminder_id)?,
      review_id:   decode_uuid(&self.review_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      kind:        ReminderKind::from_name(&self.kind)?,
      remind_at:   decode_dt(&self.remind_at)?,
      active:      self.active,
      created_at:  decode_dt(&self.created_at)?,
      modified_at: decode_dt(&self.modified_at)?,
    })
  }
}

pub struct RawEvent {
  pub event_id:     String,
  pub project_id:   String,
  pub review_id:    String,
  pub code:         String,
  pub related_type: String,
  pub related_id:   String,
  pub user_id:      String,
  pub created_at:   String,
}

impl RawEvent {
  pub const COLUMNS: &'static str = "event_id, project_id, review_id, code, \
                             related_type, related_id, user_id, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:     row.get(0)?,
      project_id:   row.get(1)?,
      review_id:    row.get(2)?,
      code:         row.get(3)?,
      related_type: row.get(4)?,
      related_id:   row.get(5)?,
      user_id:      row.get(6)?,
      created_at:   row.get(7)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      event_id:     decode_uuid(&self.event_id)?,
      project_id:   decode_uuid(&self.project_id)?,
      review_id:    decode_uuid(&self.review_id)?,
      code:         EventCode::from_code(&self.code)?,
      related_type: RelatedType::from_name(&self.related_type)?,
      related_id:   decode_uuid(&self.related_id)?,
      user_id:      decode_uuid(&self.user_id)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawComment {
  pub comment_id:   String,
  pub review_id:    String,
  pub revision_id:  String,
  pub thread_id:    String,
  pub commenter_id: String,
  pub body:         String,
  pub created_at:   String,
}

impl RawComment {
  pub const COLUMNS: &'static str = "comment_id, review_id, revision_id, thread_id, \
                             commenter_id, body, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id:   row.get(0)?,
      review_id:    row.get(1)?,
      revision_id:  row.get(2)?,
      thread_id:    row.get(3)?,
      commenter_id: row.get(4)?,
      body:         row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id:   decode_uuid(&self.comment_id)?,
      review_id:    decode_uuid(&self.review_id)?,
      revision_id:  decode_uuid(&self.revision_id)?,
      thread_id:    decode_uuid(&self.thread_id)?,
      commenter_id: decode_uuid(&self.commenter_id)?,
      body:         self.body,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawIssue {
  pub issue_id:    String,
  pub review_id:   String,
  pub comment_id:  String,
  pub created_by:  String,
  pub resolved_by: Option<String>,
  pub created_at:  String,
  pub modified_at: String,
}

impl RawIssue {
  pub const COLUMNS: &'static str = "issue_id, review_id, comment_id, created_by, \
                             resolved_by, created_at, modified_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      issue_id:    row.get(0)?,
      review_id:   row.get(1)?,
      comment_id:  row.get(2)?,
      created_by:  row.get(3)?,
      resolved_by: row.get(4)?,
      created_at:  row.get(5)?,
      modified_at: row.get(6)?,
    })
  }

  pub fn into_issue(self) -> Result<Issue> {
    Ok(Issue {
      issue_id:    decode_uuid(&self.issue_id)?,
      review_id:   decode_uuid(&self.review_id)?,
      comment_id:  decode_uuid(&self.comment_id)?,
      created_by:  decode_uuid(&self.created_by)?,
      resolved_by: decode_opt_uuid(self.resolved_by.as_deref())?,
      created_at:  decode_dt(&self.created_at)?,
      modified_at: decode_dt(&self.modified_at)?,
    })
  }
}
