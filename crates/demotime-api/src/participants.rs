//! Handlers for `/reviews/{id}/{reviewers,followers,creators}/{user}`.
//!
//! `POST` adds the user, `DELETE` drops them. Both answer
//! `{"changed": bool}`; a no-op (already present, already absent) is not an
//! error.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use demotime_core::{outbound::OutboundQueue, store::ReviewStore};
use demotime_workflow::Workflow;
use uuid::Uuid;

use crate::{actor::Actor, error::ApiError, reviews::Changed};

type Target = Path<(Uuid, Uuid)>;

// ─── Reviewers ───────────────────────────────────────────────────────────────

pub async fn add_reviewer<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path((id, user)): Target,
  Actor(actor): Actor,
) -> Result<Json<Changed>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  let changed = wf.add_reviewer(id, user, actor).await?;
  Ok(Json(Changed { changed }))
}

/// Dropping someone who is not an active reviewer answers 404.
pub async fn drop_reviewer<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path((id, user)): Target,
  Actor(actor): Actor,
) -> Result<Json<Changed>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  wf.drop_reviewer(id, user, actor).await?;
  Ok(Json(Changed { changed: true }))
}

// ─── Followers ───────────────────────────────────────────────────────────────

pub async fn add_follower<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path((id, user)): Target,
  Actor(actor): Actor,
) -> Result<Json<Changed>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  let changed = wf.add_follower(id, user, actor).await?;
  Ok(Json(Changed { changed }))
}

pub async fn drop_follower<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path((id, user)): Target,
  Actor(actor): Actor,
) -> Result<Json<Changed>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  let changed = wf.drop_follower(id, user, actor).await?;
  Ok(Json(Changed { changed }))
}

// ─── Creators ────────────────────────────────────────────────────────────────

pub async fn add_creator<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path((id, user)): Target,
  Actor(actor): Actor,
) -> Result<Json<Changed>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  let changed = wf.add_creator(id, user, actor).await?;
  Ok(Json(Changed { changed }))
}

pub async fn drop_creator<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path((id, user)): Target,
  Actor(actor): Actor,
) -> Result<Json<Changed>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  let changed = wf.drop_creator(id, user, actor).await?;
  Ok(Json(Changed { changed }))
}
