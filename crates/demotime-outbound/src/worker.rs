//! The delivery worker and the channel-backed queue that feeds it.

use std::{sync::Arc, time::Duration};

use demotime_core::outbound::{OutboundJob, OutboundQueue};
use tokio::{sync::mpsc, task::JoinHandle, task::JoinSet};
use tracing::{debug, error, info, warn};

use crate::{mail::Mailer, webhook::WebhookTransport};

// ─── Retry policy ────────────────────────────────────────────────────────────

/// How often, and how patiently, a job is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, including the first. Zero is treated as one.
  pub max_attempts:    u32,
  pub initial_backoff: Duration,
  pub max_backoff:     Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts:    5,
      initial_backoff: Duration::from_millis(500),
      max_backoff:     Duration::from_secs(30),
    }
  }
}

impl RetryPolicy {
  /// The wait after failed attempt `attempt` (1-based): the initial backoff
  /// doubled per earlier failure, capped at `max_backoff`.
  pub fn backoff(&self, attempt: u32) -> Duration {
    let doublings = attempt.saturating_sub(1).min(31);
    self
      .initial_backoff
      .saturating_mul(1 << doublings)
      .min(self.max_backoff)
  }
}

// ─── Queue ───────────────────────────────────────────────────────────────────

/// The sending half handed to the workflow engine.
///
/// Cheap to clone. The worker stops once every clone has been dropped and the
/// jobs already accepted have finished.
#[derive(Debug, Clone)]
pub struct ChannelQueue {
  sender: mpsc::UnboundedSender<OutboundJob>,
}

impl OutboundQueue for ChannelQueue {
  fn enqueue(&self, job: OutboundJob) -> demotime_core::Result<()> {
    self
      .sender
      .send(job)
      .map_err(|_| demotime_core::Error::QueueClosed)
  }
}

/// What the worker did over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
  pub delivered: usize,
  pub failed:    usize,
}

// ─── Worker ──────────────────────────────────────────────────────────────────

/// Start the delivery worker on the current tokio runtime.
pub fn spawn<M, W>(
  mailer: M,
  transport: W,
  policy: RetryPolicy,
) -> (ChannelQueue, JoinHandle<WorkerStats>)
where
  M: Mailer,
  W: WebhookTransport,
{
  let (sender, receiver) = mpsc::unbounded_channel();
  let handle = tokio::spawn(run(receiver, Arc::new(mailer), Arc::new(transport), policy));
  (ChannelQueue { sender }, handle)
}

async fn run<M, W>(
  mut receiver: mpsc::UnboundedReceiver<OutboundJob>,
  mailer: Arc<M>,
  transport: Arc<W>,
  policy: RetryPolicy,
) -> WorkerStats
where
  M: Mailer,
  W: WebhookTransport,
{
  let mut in_flight = JoinSet::new();
  let mut stats = WorkerStats::default();

  loop {
    tokio::select! {
      job = receiver.recv() => {
        let Some(job) = job else { break };
        let mailer = Arc::clone(&mailer);
        let transport = Arc::clone(&transport);
        in_flight.spawn(async move {
          deliver(&job, mailer.as_ref(), transport.as_ref(), policy).await
        });
      }
      Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
        tally(&mut stats, done);
      }
    }
  }

  while let Some(done) = in_flight.join_next().await {
    tally(&mut stats, done);
  }
  info!(delivered = stats.delivered, failed = stats.failed, "outbound worker stopped");
  stats
}

fn tally(stats: &mut WorkerStats, done: Result<bool, tokio::task::JoinError>) {
  match done {
    Ok(true) => stats.delivered += 1,
    Ok(false) => stats.failed += 1,
    Err(err) => {
      error!(error = %err, "outbound delivery task panicked");
      stats.failed += 1;
    }
  }
}

fn describe(job: &OutboundJob) -> (&'static str, &str) {
  match job {
    OutboundJob::Email(email) => ("email", email.to.as_str()),
    OutboundJob::Webhook(hook) => ("webhook", hook.target.as_str()),
  }
}

/// Deliver one job, retrying per `policy`. Returns whether it got through.
async fn deliver<M, W>(
  job: &OutboundJob,
  mailer: &M,
  transport: &W,
  policy: RetryPolicy,
) -> bool
where
  M: Mailer,
  W: WebhookTransport,
{
  let (kind, destination) = describe(job);
  let max_attempts = policy.max_attempts.max(1);
  let mut attempt = 1;

  loop {
    let result = match job {
      OutboundJob::Email(email) => mailer.send(email).await,
      OutboundJob::Webhook(hook) => transport.post(hook).await,
    };
    match result {
      Ok(()) => {
        debug!(kind, destination, attempt, "outbound job delivered");
        return true;
      }
      Err(err) if attempt < max_attempts => {
        let wait = policy.backoff(attempt);
        warn!(
          kind,
          destination,
          attempt,
          retry_in_ms = wait.as_millis() as u64,
          error = %err,
          "outbound delivery failed, retrying"
        );
        tokio::time::sleep(wait).await;
        attempt += 1;
      }
      Err(err) => {
        error!(
          kind,
          destination,
          attempts = attempt,
          error = %err,
          "outbound delivery failed permanently"
        );
        return false;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use demotime_core::outbound::{EmailJob, WebhookJob};
  use serde_json::json;
  use uuid::Uuid;

  use super::*;
  use crate::{Error, LogMailer, Result};

  fn quick(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
      max_attempts,
      initial_backoff: Duration::from_millis(1),
      max_backoff: Duration::from_millis(4),
    }
  }

  fn hook(target: &str) -> OutboundJob {
    OutboundJob::Webhook(WebhookJob {
      webhook_id: Uuid::new_v4(),
      target:     target.to_owned(),
      payload:    json!({ "token": "t" }),
    })
  }

  /// Fails the first `failures` posts, then succeeds.
  #[derive(Default)]
  struct Flaky {
    failures: u32,
    calls:    AtomicU32,
  }

  impl WebhookTransport for Flaky {
    async fn post<'a>(&'a self, job: &'a WebhookJob) -> Result<()> {
      let call = self.calls.fetch_add(1, Ordering::SeqCst);
      if call < self.failures {
        return Err(Error::Status { target: job.target.clone(), status: 503 });
      }
      Ok(())
    }
  }

  #[test]
  fn backoff_doubles_and_caps() {
    let policy = RetryPolicy {
      max_attempts:    10,
      initial_backoff: Duration::from_millis(100),
      max_backoff:     Duration::from_millis(1000),
    };
    assert_eq!(policy.backoff(1), Duration::from_millis(100));
    assert_eq!(policy.backoff(2), Duration::from_millis(200));
    assert_eq!(policy.backoff(4), Duration::from_millis(800));
    assert_eq!(policy.backoff(5), Duration::from_millis(1000));
    assert_eq!(policy.backoff(60), Duration::from_millis(1000));
  }

  #[tokio::test]
  async fn retries_until_delivered() {
    let flaky = Flaky { failures: 2, ..Flaky::default() };
    let ok = deliver(&hook("https://a.example"), &LogMailer, &flaky, quick(3)).await;
    assert!(ok);
    assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn gives_up_after_max_attempts() {
    let flaky = Flaky { failures: u32::MAX, ..Flaky::default() };
    let ok = deliver(&hook("https://a.example"), &LogMailer, &flaky, quick(3)).await;
    assert!(!ok);
    assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn worker_drains_before_stopping() {
    let (queue, handle) = spawn(LogMailer, Flaky::default(), quick(2));
    queue.enqueue(hook("https://a.example")).unwrap();
    queue.enqueue(hook("https://b.example")).unwrap();
    queue
      .enqueue(OutboundJob::Email(EmailJob {
        to:      "rita@example.com".into(),
        subject: "[DT-1] - Widget".into(),
        body:    "hello".into(),
      }))
      .unwrap();
    drop(queue);

    let stats = handle.await.unwrap();
    assert_eq!(stats, WorkerStats { delivered: 3, failed: 0 });
  }

  #[tokio::test]
  async fn closed_worker_rejects_jobs() {
    let (queue, handle) = spawn(LogMailer, Flaky::default(), quick(1));
    handle.abort();
    let _ = handle.await;
    let err = queue.enqueue(hook("https://a.example")).unwrap_err();
    assert!(matches!(err, demotime_core::Error::QueueClosed));
  }
}
