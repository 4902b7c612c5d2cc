//! JSON REST API for Bizhub.
//!
//! Exposes an axum [`Router`] backed by any [`bizhub_core::store::RecordStore`].
//! Every handler here acts as the CRUD dispatcher: it consults the policies in
//! [`bizhub_core::policy`] before mutating and builds a
//! [`bizhub_core::filter::Predicate`] before listing. TLS and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", bizhub_api::api_router(AppState::new(store)))
//! ```

pub mod attributes;
pub mod auth;
pub mod business;
pub mod error;
pub mod extract;
pub mod feed;
pub mod guard;
pub mod profiles;

use std::sync::Arc;

use axum::{Router, routing::get};
use bizhub_core::{policy::RoleGate, store::RecordStore};

use attributes::{Tags, Tasks};

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: RecordStore> {
  pub store:     Arc<S>,
  /// Capability check applied to the business endpoints, if configured.
  pub role_gate: Option<Arc<RoleGate>>,
}

impl<S: RecordStore> AppState<S> {
  pub fn new(store: S) -> Self { Self { store: Arc::new(store), role_gate: None } }

  pub fn with_role_gate(mut self, gate: RoleGate) -> Self {
    self.role_gate = Some(Arc::new(gate));
    self
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Profiles
    .route("/profiles", get(profiles::list::<S>))
    .route(
      "/profiles/{id}",
      get(profiles::get_one::<S>)
        .put(profiles::update::<S>)
        .patch(profiles::partial_update::<S>)
        .delete(profiles::delete::<S>),
    )
    // Feed
    .route("/feed", get(feed::list::<S>).post(feed::create::<S>))
    .route(
      "/feed/{id}",
      get(feed::get_one::<S>)
        .put(feed::update::<S>)
        .patch(feed::partial_update::<S>)
        .delete(feed::delete::<S>),
    )
    // Tags and tasks
    .route("/tags", get(attributes::list::<S, Tags>).post(attributes::create::<S, Tags>))
    .route("/tasks", get(attributes::list::<S, Tasks>).post(attributes::create::<S, Tasks>))
    // Businesses
    .route("/business", get(business::list::<S>).post(business::create::<S>))
    .route(
      "/business/{id}",
      get(business::get_one::<S>)
        .put(business::update::<S>)
        .patch(business::partial_update::<S>)
        .delete(business::delete::<S>),
    )
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
