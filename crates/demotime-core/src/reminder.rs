//! Recurring reminders, one per (review, user).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReminderKind {
  Creator,
  Reviewer,
}

impl ReminderKind {
  pub fn name(self) -> &'static str { self.into() }

  pub fn from_name(name: &str) -> Result<Self> {
    name
      .parse()
      .map_err(|_| Error::UnknownReminderKind(name.to_owned()))
  }
}

/// A reminder row. Firing a reminder does not deactivate it; it recurs until a
/// vote or state change switches it off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
  pub reminder_id: Uuid,
  pub review_id:   Uuid,
  pub user_id:     Uuid,
  pub kind:        ReminderKind,
  pub remind_at:   DateTime<Utc>,
  pub active:      bool,
  pub created_at:  DateTime<Utc>,
  pub modified_at: DateTime<Utc>,
}

impl Reminder {
  pub fn new(
    review_id: Uuid,
    user_id: Uuid,
    kind: ReminderKind,
    remind_at: DateTime<Utc>,
    at: DateTime<Utc>,
  ) -> Self {
    Self {
      reminder_id: Uuid::new_v4(),
      review_id,
      user_id,
      kind,
      remind_at,
      active: true,
      created_at: at,
      modified_at: at,
    }
  }

  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    self.active && self.remind_at <= now
  }
}

/// A due reminder joined with what the poller needs to send it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueReminder {
  pub reminder:        Reminder,
  pub project_id:      Uuid,
  pub review_title:    String,
  pub recipient_email: Option<String>,
}
