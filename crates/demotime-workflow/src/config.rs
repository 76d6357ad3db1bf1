//! Process-wide engine configuration.

use demotime_core::settings::DEFAULT_REMINDER_DAYS;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Sender of every system message and the actor allowed to drive
  /// transitions on anyone's behalf.
  pub system_actor:          Uuid,
  /// Base URL used to build review links in message bodies.
  pub server_url:            String,
  /// Surface enqueue failures to the caller instead of logging them.
  pub strict_delivery:       bool,
  /// Reminder interval used when a project has no `reminder_days` setting.
  pub default_reminder_days: u32,
}

impl EngineConfig {
  pub fn new(system_actor: Uuid) -> Self {
    Self {
      system_actor,
      server_url: String::from("http://localhost:8000"),
      strict_delivery: false,
      default_reminder_days: DEFAULT_REMINDER_DAYS,
    }
  }

  pub fn review_url(&self, review_id: Uuid) -> String {
    format!("{}/reviews/{review_id}", self.server_url.trim_end_matches('/'))
  }
}
