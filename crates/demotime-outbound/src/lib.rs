//! Asynchronous delivery of the emails and webhooks the workflow produces.
//!
//! [`spawn`] starts a worker task and returns a [`ChannelQueue`] that the
//! engine enqueues into. Each job is delivered on its own task and retried
//! with exponential backoff; a job that runs out of attempts is logged at
//! `error` level and dropped.

// Transport traits use return-position `impl Future` with explicit `Send`
// bounds, so the advisory lint does not apply.
#![allow(async_fn_in_trait)]

mod error;
pub mod mail;
pub mod webhook;
pub mod worker;

pub use error::{Error, Result};
pub use mail::{LogMailer, Mailer};
pub use webhook::{HttpWebhookTransport, WebhookTransport};
pub use worker::{ChannelQueue, RetryPolicy, WorkerStats, spawn};
