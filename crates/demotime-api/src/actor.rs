//! The acting user, taken from the `x-demotime-user` header.
//!
//! Authentication happens in front of this service; the header is trusted as
//! given.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

pub const ACTOR_HEADER: &str = "x-demotime-user";

/// The user on whose behalf the request runs.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let raw = parts
      .headers
      .get(ACTOR_HEADER)
      .and_then(|v| v.to_str().ok())
      .ok_or_else(|| ApiError::BadRequest(format!("missing {ACTOR_HEADER} header")))?;
    let id = Uuid::parse_str(raw.trim())
      .map_err(|_| ApiError::BadRequest(format!("{ACTOR_HEADER} is not a UUID")))?;
    Ok(Actor(id))
  }
}
