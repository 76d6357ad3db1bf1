//! Handlers for comments and issues.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/reviews/{id}/comments` | Body: `{"body":"...","thread_id":null}`; returns 201 |
//! | `GET`  | `/reviews/{id}/comments` | Oldest first |
//! | `POST` | `/reviews/{id}/issues` | Body: `{"comment_id":"..."}`; returns 201 |
//! | `POST` | `/issues/{id}/resolve` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use demotime_core::{
  comment::{Comment, Issue},
  outbound::OutboundQueue,
  store::ReviewStore,
};
use demotime_workflow::Workflow;
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::Actor, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CommentBody {
  pub body:      String,
  #[serde(default)]
  pub thread_id: Option<Uuid>,
}

/// `POST /reviews/{id}/comments`
pub async fn create<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path(id): Path<Uuid>,
  Actor(actor): Actor,
  Json(body): Json<CommentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  let comment = wf.add_comment(id, actor, body.body, body.thread_id).await?;
  Ok((StatusCode::CREATED, Json(comment)))
}

/// `GET /reviews/{id}/comments`
pub async fn list<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  wf.review(id).await?;
  let comments = wf
    .store()
    .comments(id)
    .await
    .map_err(|e| ApiError::Internal(Box::new(e)))?;
  Ok(Json(comments))
}

#[derive(Debug, Deserialize)]
pub struct IssueBody {
  pub comment_id: Uuid,
}

/// `POST /reviews/{id}/issues`
pub async fn create_issue<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path(id): Path<Uuid>,
  Actor(actor): Actor,
  Json(body): Json<IssueBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  let issue = wf.create_issue(id, body.comment_id, actor).await?;
  Ok((StatusCode::CREATED, Json(issue)))
}

/// `POST /issues/{id}/resolve`
pub async fn resolve_issue<S, Q>(
  State(wf): State<Arc<Workflow<S, Q>>>,
  Path(id): Path<Uuid>,
  Actor(actor): Actor,
) -> Result<Json<Issue>, ApiError>
where
  S: ReviewStore,
  Q: OutboundQueue,
{
  Ok(Json(wf.resolve_issue(id, actor).await?))
}
