//! JSON/CSV HTTP API for the diagnosis service.
//!
//! Exposes an axum [`Router`] backed by any [`RecordStore`] and
//! [`Generator`]. TLS, auth and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", diag_api::api_router(state))
//! ```

pub mod dashboard;
pub mod diagnoses;
pub mod error;

use std::sync::Arc;

use axum::{Router, routing::get};
use diag_core::{generate::Generator, store::RecordStore};

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S, G> {
  pub store:     Arc<S>,
  pub generator: Arc<G>,
}

impl<S, G> ApiState<S, G> {
  pub fn new(store: S, generator: G) -> Self {
    Self {
      store:     Arc::new(store),
      generator: Arc::new(generator),
    }
  }
}

impl<S, G> Clone for ApiState<S, G> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      generator: Arc::clone(&self.generator),
    }
  }
}

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, G>(state: ApiState<S, G>) -> Router<()>
where
  S: RecordStore + 'static,
  G: Generator + 'static,
{
  Router::new()
    .route(
      "/diagnoses",
      get(diagnoses::list::<S, G>)
        .post(diagnoses::create::<S, G>)
        .delete(diagnoses::clear::<S, G>),
    )
    .route("/diagnoses.csv", get(diagnoses::export_csv::<S, G>))
    .route("/dashboard", get(dashboard::handler::<S, G>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
