//! Handlers for the actor's message bundles.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/bundles` | The actor's bundles, most recent first |
//! | `GET`  | `/bundles/{id}/messages` | Oldest first; only the owner may read |
//! | `PUT`  | `/bundles/{id}` | Body: `{"read":true,"deleted":false}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use demotime_core::{
  message::{Message, MessageBundle},
  outbound::OutboundQueue,
  store::ReviewStore,
};
use demotime_workflow::Workflow;
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::Actor, error::ApiError};

fn internal(e: impl std::error::Error + Send + Sync + 'static) -> ApiError {
  ApiError::Internal(Box::new(e))
}

/// Bundles belonging to someone else answer 404, like missing ones.
async fn ensure_owner<S, Q>(
  wf: &Workflow<S, Q>,
  bundle_id: Uuid,
  actor: Uuid,
) -> Result<(), ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  let owned = wf
    .store()
    .bundles(actor)
    .await
    .map_err(internal)?
    .iter()
    .any(|b| b.bundle_id == bundle_id);
  if !owned {
    return Err(ApiError::NotFound(format!(
      "message bundle not found: {bundle_id}"
    )));
  }
  Ok(())
}

/// `GET /bundles`
pub async fn list<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Actor(actor): Actor,
) -> Result<Json<Vec<MessageBundle>>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  let bundles = wf.store().bundles(actor).await.map_err(internal)?;
  Ok(Json(bundles))
}

/// `GET /bundles/{id}/messages`
pub async fn messages<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path(id): Path<Uuid>,
  Actor(actor): Actor,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  ensure_owner(&wf, id, actor).await?;
  let messages = wf.store().messages(id).await.map_err(internal)?;
  Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct FlagsBody {
  #[serde(default)]
  pub read:    bool,
  #[serde(default)]
  pub deleted: bool,
}

/// `PUT /bundles/{id}`
pub async fn set_flags<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path(id): Path<Uuid>,
  Actor(actor): Actor,
  Json(body): Json<FlagsBody>,
) -> Result<StatusCode, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  ensure_owner(&wf, id, actor).await?;
  wf.set_bundle_flags(id, body.read, body.deleted).await?;
  Ok(StatusCode::NO_CONTENT)
}
