//! Webhook transports.

use std::{future::Future, time::Duration};

use demotime_core::outbound::WebhookJob;
use reqwest::Client;

use crate::{Error, Result};

/// Posts one webhook payload to its target.
pub trait WebhookTransport: Send + Sync + 'static {
  fn post<'a>(
    &'a self,
    job: &'a WebhookJob,
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}

/// JSON `POST` over HTTP. Any non-2xx answer counts as a failure.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpWebhookTransport {
  client: Client,
}

impl HttpWebhookTransport {
  pub fn new(timeout: Duration) -> Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client })
  }
}

impl WebhookTransport for HttpWebhookTransport {
  async fn post<'a>(&'a self, job: &'a WebhookJob) -> Result<()> {
    let resp = self
      .client
      .post(&job.target)
      .json(&job.payload)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status {
        target: job.target.clone(),
        status: status.as_u16(),
      });
    }
    tracing::debug!(url = %job.target, status = status.as_u16(), "webhook delivered");
    Ok(())
  }
}
