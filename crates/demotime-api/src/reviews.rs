//! Handlers for `/reviews` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/reviews` | Body: [`NewReview`]; returns 201 + snapshot |
//! | `GET`  | `/reviews/{id}` | 404 if not found |
//! | `PUT`  | `/reviews/{id}` | Body: [`ReviewUpdate`]; publishes a new revision |
//! | `POST` | `/reviews/{id}/state` | Body: `{"state":"paused"}` |
//! | `POST` | `/reviews/{id}/votes` | Body: `{"status":"approved"}` |
//! | `POST` | `/reviews/{id}/viewed` | Marks the review read for the actor |
//! | `GET`  | `/reviews/{id}/events` | Oldest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use demotime_core::{
  event::Event,
  outbound::OutboundQueue,
  review::ReviewSnapshot,
  state::ReviewerState,
  store::ReviewStore,
};
use demotime_workflow::{NewReview, ReviewUpdate, Workflow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{actor::Actor, error::ApiError};

// ─── Create / read / update ──────────────────────────────────────────────────

/// `POST /reviews`
pub async fn create<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Actor(actor): Actor,
  Json(body): Json<NewReview>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  let snap = wf.create_review(body, actor).await?;
  Ok((StatusCode::CREATED, Json(snap)))
}

/// `GET /reviews/{id}`
pub async fn get_one<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ReviewSnapshot>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  Ok(Json(wf.review(id).await?))
}

/// `PUT /reviews/{id}`
pub async fn update<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path(id): Path<Uuid>,
  Actor(actor): Actor,
  Json(body): Json<ReviewUpdate>,
) -> Result<Json<ReviewSnapshot>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  Ok(Json(wf.update_review(id, body, actor).await?))
}

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StateBody {
  pub state: String,
}

#[derive(Debug, Serialize)]
pub struct Changed {
  pub changed: bool,
}

/// `POST /reviews/{id}/state`, body: `{"state":"closed"}`
pub async fn change_state<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path(id): Path<Uuid>,
  Actor(actor): Actor,
  Json(body): Json<StateBody>,
) -> Result<Json<Changed>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  let changed = wf.change_state(id, &body.state, actor).await?;
  Ok(Json(Changed { changed }))
}

// ─── Votes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VoteBody {
  pub status: ReviewerState,
}

#[derive(Debug, Serialize)]
pub struct VoteOutcome {
  /// Whether the vote moved the consensus.
  pub changed:        bool,
  pub reviewer_state: ReviewerState,
}

/// `POST /reviews/{id}/votes`, body: `{"status":"approved"}`
pub async fn vote<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path(id): Path<Uuid>,
  Actor(actor): Actor,
  Json(body): Json<VoteBody>,
) -> Result<Json<VoteOutcome>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  let moved = wf.cast_vote(id, actor, body.status).await?;
  let reviewer_state = match moved {
    Some(state) => state,
    None => wf.review(id).await?.review.reviewer_state,
  };
  Ok(Json(VoteOutcome { changed: moved.is_some(), reviewer_state }))
}

// ─── Read tracking and history ───────────────────────────────────────────────

/// `POST /reviews/{id}/viewed`
pub async fn viewed<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path(id): Path<Uuid>,
  Actor(actor): Actor,
) -> Result<StatusCode, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  wf.mark_viewed(id, actor).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /reviews/{id}/events`
pub async fn events<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Event>>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  Ok(Json(wf.events(id).await?))
}
