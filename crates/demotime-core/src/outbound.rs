//! Outbound delivery jobs and the queue they are handed to.
//!
//! Email and webhook delivery is best-effort and happens off the request path.
//! The engine only ever calls [`OutboundQueue::enqueue`], and only after the
//! transition that produced the job has been committed.

use std::sync::{
  Mutex,
  PoisonError,
  atomic::{AtomicBool, Ordering},
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailJob {
  pub to:      String,
  pub subject: String,
  pub body:    String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookJob {
  pub webhook_id: Uuid,
  pub target:     String,
  pub payload:    serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundJob {
  Email(EmailJob),
  Webhook(WebhookJob),
}

/// Accepts jobs for asynchronous delivery. Must not block.
pub trait OutboundQueue: Send + Sync {
  fn enqueue(&self, job: OutboundJob) -> Result<()>;
}

/// Synchronous test double: records every job instead of delivering it.
#[derive(Debug, Default)]
pub struct RecordingQueue {
  jobs:   Mutex<Vec<OutboundJob>>,
  closed: AtomicBool,
}

impl RecordingQueue {
  pub fn new() -> Self { Self::default() }

  /// Make subsequent `enqueue` calls fail with [`Error::QueueClosed`].
  pub fn close(&self) { self.closed.store(true, Ordering::SeqCst); }

  pub fn jobs(&self) -> Vec<OutboundJob> {
    self.jobs.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Drain the recorded jobs.
  pub fn take(&self) -> Vec<OutboundJob> {
    std::mem::take(&mut *self.jobs.lock().unwrap_or_else(PoisonError::into_inner))
  }

  pub fn emails(&self) -> Vec<EmailJob> {
    self
      .jobs()
      .into_iter()
      .filter_map(|j| match j {
        OutboundJob::Email(e) => Some(e),
        OutboundJob::Webhook(_) => None,
      })
      .collect()
  }

  pub fn webhooks(&self) -> Vec<WebhookJob> {
    self
      .jobs()
      .into_iter()
      .filter_map(|j| match j {
        OutboundJob::Webhook(w) => Some(w),
        OutboundJob::Email(_) => None,
      })
      .collect()
  }
}

impl OutboundQueue for RecordingQueue {
  fn enqueue(&self, job: OutboundJob) -> Result<()> {
    if self.closed.load(Ordering::SeqCst) {
      return Err(Error::QueueClosed);
    }
    self
      .jobs
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push(job);
    Ok(())
  }
}
