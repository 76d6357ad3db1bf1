//! The in-memory unit of work one operation runs against.
//!
//! A [`Unit`] owns a working copy of the review snapshot. Engine steps update
//! the working copy (so later steps observe earlier ones) and record the
//! matching durable write in the [`Changeset`]. Outbound jobs are collected on
//! the side and only released once the changeset has committed.

use chrono::{DateTime, Utc};
use demotime_core::{
  changeset::{Changeset, Mutation},
  outbound::OutboundJob,
  review::ReviewSnapshot,
  time::BusinessCalendar,
};
use uuid::Uuid;

use crate::config::EngineConfig;

pub(crate) struct Unit<'a> {
  pub snap:     ReviewSnapshot,
  /// The user performing the operation.
  pub actor:    Uuid,
  pub now:      DateTime<Utc>,
  /// Business days between reminders for this review's project.
  pub days:     u32,
  pub config:   &'a EngineConfig,
  calendar:     &'a dyn BusinessCalendar,
  changes:      Changeset,
  jobs:         Vec<OutboundJob>,
}

impl<'a> Unit<'a> {
  pub fn new(
    snap: ReviewSnapshot,
    actor: Uuid,
    now: DateTime<Utc>,
    days: u32,
    config: &'a EngineConfig,
    calendar: &'a dyn BusinessCalendar,
  ) -> Self {
    Self {
      snap,
      actor,
      now,
      days,
      config,
      calendar,
      changes: Changeset::new(),
      jobs: Vec::new(),
    }
  }

  pub fn review_id(&self) -> Uuid { self.snap.review.review_id }

  pub fn project_id(&self) -> Uuid { self.snap.review.project_id }

  pub fn is_draft(&self) -> bool {
    self.snap.review.demo_state == demotime_core::state::DemoState::Draft
  }

  /// A fresh reminder due date: `days` business days from now.
  pub fn due_at(&self) -> DateTime<Utc> {
    self.calendar.add_business_days(self.now, self.days)
  }

  pub fn push(&mut self, mutation: Mutation) { self.changes.push(mutation); }

  pub fn job(&mut self, job: OutboundJob) { self.jobs.push(job); }

  /// Bump the review's `modified_at` in the working copy.
  pub fn touch(&mut self) { self.snap.review.modified_at = self.now; }

  pub fn into_parts(self) -> (ReviewSnapshot, Changeset, Vec<OutboundJob>) {
    (self.snap, self.changes, self.jobs)
  }
}
