//! Email transports.

use std::future::Future;

use demotime_core::outbound::EmailJob;

use crate::Result;

/// Sends one email.
pub trait Mailer: Send + Sync + 'static {
  fn send<'a>(
    &'a self,
    email: &'a EmailJob,
  ) -> impl Future<Output = Result<()>> + Send + 'a;
}

/// Writes each email to the log instead of sending it. This is the default
/// for development servers without a mail relay.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
  async fn send<'a>(&'a self, email: &'a EmailJob) -> Result<()> {
    tracing::info!(
      to = %email.to,
      subject = %email.subject,
      bytes = email.body.len(),
      "email sent"
    );
    Ok(())
  }
}
