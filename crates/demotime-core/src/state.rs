//! The two independent state fields carried by every review.
//!
//! `DemoState` is the primary lifecycle; `ReviewerState` is the consensus of
//! the individual reviewer votes. The same three-valued enum is used for an
//! individual reviewer's vote, since the vote and the consensus range over the
//! same names.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result};

// ─── Demo state ──────────────────────────────────────────────────────────────

/// Lifecycle state of a demo. Two states are equal iff their names are equal.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DemoState {
  Draft,
  Open,
  Paused,
  Closed,
  Aborted,
  Cancelled,
}

impl DemoState {
  /// The symbolic name stored in the `demo_state` column.
  pub fn name(self) -> &'static str { self.into() }

  /// Parse a state name, rejecting anything that is not one of the six states.
  pub fn from_name(name: &str) -> Result<Self> {
    name
      .parse()
      .map_err(|_| Error::UnknownDemoState(name.to_owned()))
  }

  /// Capitalised name used in message titles ("Closed", "Paused", ...).
  pub fn title(self) -> &'static str {
    match self {
      Self::Draft => "Draft",
      Self::Open => "Open",
      Self::Paused => "Paused",
      Self::Closed => "Closed",
      Self::Aborted => "Aborted",
      Self::Cancelled => "Cancelled",
    }
  }

  /// No transitions leave a terminal state.
  pub fn is_terminal(self) -> bool { matches!(self, Self::Cancelled) }
}

// ─── Reviewer state ──────────────────────────────────────────────────────────

/// Consensus state of a review, and the vote of a single reviewer.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReviewerState {
  #[default]
  Reviewing,
  Approved,
  Rejected,
}

impl ReviewerState {
  pub fn name(self) -> &'static str { self.into() }

  pub fn from_name(name: &str) -> Result<Self> {
    name
      .parse()
      .map_err(|_| Error::UnknownReviewerState(name.to_owned()))
  }

  pub fn title(self) -> &'static str {
    match self {
      Self::Reviewing => "Reviewing",
      Self::Approved => "Approved",
      Self::Rejected => "Rejected",
    }
  }
}
