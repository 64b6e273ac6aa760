//! Core types, trait seams, and the lifecycle coordinator for Casework.
//!
//! No HTTP or database dependencies.
//! Storage backends implement the traits in [`store`]; generation adapters
//! implement [`gateway::GenerationGateway`].

// Implementations use native `async fn` in traits.
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod artifact;
pub mod case;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod store;
pub mod subject;
pub mod user;

pub use error::{Error, ErrorKind, GenerationError, Result};
pub use lifecycle::{Coordinator, LifecycleConfig, SubmitOutcome};
