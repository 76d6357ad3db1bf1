//! JSON REST API for DemoTime.
//!
//! Exposes an axum [`Router`] backed by a [`Workflow`] over any
//! [`ReviewStore`]. Authentication sits in front of this service; the acting
//! user arrives in the [`ACTOR_HEADER`] header.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", demotime_api::api_router(workflow.clone()))
//! ```

pub mod actor;
pub mod comments;
pub mod error;
pub mod messages;
pub mod participants;
pub mod reviews;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use demotime_core::{outbound::OutboundQueue, store::ReviewStore};
use demotime_workflow::Workflow;

pub use actor::{ACTOR_HEADER, Actor};
pub use error::ApiError;

/// Build a fully-materialised API router over `workflow`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, Q>(workflow: Arc<Workflow<S, Q>>) -> Router<()>
where
  S: ReviewStore + 'static,
  Q: OutboundQueue + 'static,
{
  Router::new()
    // Reviews
    .route("/reviews", post(reviews::create::<S, Q>))
    .route(
      "/reviews/{id}",
      get(reviews::get_one::<S, Q>).put(reviews::update::<S, Q>),
    )
    .route("/reviews/{id}/state", post(reviews::change_state::<S, Q>))
    .route("/reviews/{id}/votes", post(reviews::vote::<S, Q>))
    .route("/reviews/{id}/viewed", post(reviews::viewed::<S, Q>))
    .route("/reviews/{id}/events", get(reviews::events::<S, Q>))
    // Participants
    .route(
      "/reviews/{id}/reviewers/{user}",
      post(participants::add_reviewer::<S, Q>)
        .delete(participants::drop_reviewer::<S, Q>),
    )
    .route(
      "/reviews/{id}/followers/{user}",
      post(participants::add_follower::<S, Q>)
        .delete(participants::drop_follower::<S, Q>),
    )
    .route(
      "/reviews/{id}/creators/{user}",
      post(participants::add_creator::<S, Q>)
        .delete(participants::drop_creator::<S, Q>),
    )
    // Comments and issues
    .route(
      "/reviews/{id}/comments",
      get(comments::list::<S, Q>).post(comments::create::<S, Q>),
    )
    .route("/reviews/{id}/issues", post(comments::create_issue::<S, Q>))
    .route("/issues/{id}/resolve", post(comments::resolve_issue::<S, Q>))
    // Messages
    .route("/bundles", get(messages::list::<S, Q>))
    .route("/bundles/{id}", put(messages::set_flags::<S, Q>))
    .route("/bundles/{id}/messages", get(messages::messages::<S, Q>))
    .with_state(workflow)
}
