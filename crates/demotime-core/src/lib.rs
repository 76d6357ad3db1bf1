//! Core types and trait definitions for DemoTime.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the review aggregate, the two state enums, the [`store::ReviewStore`]
//! persistence trait, the [`changeset::Changeset`] unit of work, and the
//! [`outbound::OutboundQueue`] seam used for email and webhook delivery.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod changeset;
pub mod comment;
pub mod error;
pub mod event;
pub mod message;
pub mod outbound;
pub mod reminder;
pub mod review;
pub mod settings;
pub mod state;
pub mod store;
pub mod time;
pub mod user;
pub mod webhook;

pub use error::{Error, Result};
