//! The DemoTime review workflow engine.
//!
//! A review runs two state machines side by side. The demo state
//! (`draft`, `open`, `paused`, `closed`, `aborted`, `cancelled`) is driven by
//! the review's owners. The reviewer state (`reviewing`, `approved`,
//! `rejected`) is derived from the votes of the active reviewers and moves on
//! its own whenever a vote or the reviewer set changes.
//!
//! Each entry action fans out into events, in-app messages, emails,
//! reminders, read-status invalidation, and webhooks. [`Workflow`] gathers all
//! of that into one changeset per operation, commits it atomically, and only
//! then hands emails and webhooks to the outbound queue.

mod config;
pub mod consensus;
mod demo_machine;
mod error;
mod events;
mod facade;
mod fanout;
mod notify;
mod participants;
mod reminders;
mod unit;
mod webhooks;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use facade::{NewReview, ReviewUpdate, Workflow};

#[cfg(test)]
mod tests;
