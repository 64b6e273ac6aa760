//! JSON REST API for casework.
//!
//! Exposes an axum [`Router`] backed by any store implementing the three
//! casework store traits, plus a [`Coordinator`] for the multi-record case
//! operations. Cross-origin headers, tracing, and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", casework_api::api_router(store.clone(), coordinator))
//! ```

pub mod artifacts;
pub mod cases;
pub mod error;
pub mod extract;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use casework_core::{
  Coordinator,
  gateway::GenerationGateway,
  store::{ArtifactStore, CaseRegistry, UserProgressStore},
};

pub use error::ApiError;

/// A backend that owns every casework collection.
pub trait Store: CaseRegistry + UserProgressStore + ArtifactStore + 'static {}

impl<T> Store for T where T: CaseRegistry + UserProgressStore + ArtifactStore + 'static {}

/// Shared state threaded through all handlers.
pub struct ApiState<S, G> {
  pub store:       Arc<S>,
  pub coordinator: Arc<Coordinator<S, S, G>>,
}

impl<S, G> Clone for ApiState<S, G> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), coordinator: self.coordinator.clone() }
  }
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, G>(store: Arc<S>, coordinator: Arc<Coordinator<S, S, G>>) -> Router<()>
where
  S: Store,
  G: GenerationGateway + 'static,
{
  Router::new()
    // Cases
    .route("/cases", post(cases::create::<S, G>))
    .route("/cases/{id}", get(cases::get_one::<S, G>))
    .route("/cases/{id}/submit", post(cases::submit::<S, G>))
    // Artifacts
    .route("/analyses", post(artifacts::record_analysis::<S, G>))
    .route(
      "/submissions",
      get(artifacts::list_submissions::<S, G>).post(artifacts::record_submission::<S, G>),
    )
    .route("/grades", post(artifacts::record_grade::<S, G>))
    // Users
    .route("/users/{id}", get(users::get_or_create::<S, G>))
    .route("/users/{id}/cases", get(users::list_cases::<S, G>))
    .with_state(ApiState { store, coordinator })
}
