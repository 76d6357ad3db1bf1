//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use demotime_workflow::Error as WorkflowError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<WorkflowError> for ApiError {
  fn from(err: WorkflowError) -> Self {
    let message = err.to_string();
    match err {
      WorkflowError::InvalidState(_) | WorkflowError::Validation(_) => {
        Self::BadRequest(message)
      }
      WorkflowError::PermissionDenied { .. } => Self::Forbidden(message),
      WorkflowError::ReviewNotFound(_)
      | WorkflowError::ReviewerNotFound { .. }
      | WorkflowError::UserNotFound(_)
      | WorkflowError::ProjectNotFound(_)
      | WorkflowError::CommentNotFound(_)
      | WorkflowError::IssueNotFound(_)
      | WorkflowError::BundleNotFound(_) => Self::NotFound(message),
      WorkflowError::InvalidTransition { .. }
      | WorkflowError::ConcurrentModification(_) => Self::Conflict(message),
      WorkflowError::Delivery(_) | WorkflowError::Store(_) => {
        Self::Internal(Box::new(err))
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
