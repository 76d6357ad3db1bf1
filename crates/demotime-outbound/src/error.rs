//! Error type for `demotime-outbound`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("webhook target {target} answered {status}")]
  Status { target: String, status: u16 },

  #[error("mail delivery failed: {0}")]
  Mail(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
