//! Users and projects: the identities a review refers to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A person (or the system actor) that can own, review, or follow a demo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:      Uuid,
  pub username:     String,
  pub display_name: Option<String>,
  /// Address used for outbound email; users without one only get in-app
  /// messages.
  pub email:        Option<String>,
  pub created_at:   DateTime<Utc>,
}

impl User {
  /// Display name if set, otherwise the username.
  pub fn name(&self) -> &str {
    self.display_name.as_deref().unwrap_or(&self.username)
  }
}

/// Input to [`crate::store::ReviewStore::add_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:     String,
  pub display_name: Option<String>,
  pub email:        Option<String>,
}

impl NewUser {
  pub fn new(username: impl Into<String>) -> Self {
    Self { username: username.into(), display_name: None, email: None }
  }

  pub fn with_email(mut self, email: impl Into<String>) -> Self {
    self.email = Some(email.into());
    self
  }
}

/// A project groups reviews and owns webhooks and settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  pub project_id: Uuid,
  pub name:       String,
  /// Opaque token sent with every webhook so receivers can authenticate us.
  pub token:      String,
  pub created_at: DateTime<Utc>,
}
