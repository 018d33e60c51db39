//! JSON REST API for forma.
//!
//! Exposes an axum [`Router`] backed by any [`SchemaStore`] and any
//! [`Caster`]. Auth, TLS, and CORS are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = forma_api::api_router(Arc::new(store), Arc::new(caster));
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod generate;
pub mod generations;
pub mod schemas;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use forma_core::{cast::Caster, store::SchemaStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Shared state ────────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S, C> {
  pub store:  Arc<S>,
  pub caster: Arc<C>,
}

// Derived `Clone` would demand `S: Clone` and `C: Clone`.
impl<S, C> Clone for ApiState<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      caster: Arc::clone(&self.caster),
    }
  }
}

/// JSON body of `PUT /schemas/{name}` and `POST /generate/{name}`.
#[derive(Debug, Deserialize)]
pub struct PromptBody {
  pub prompt: String,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be served directly or nested into any
/// parent router regardless of its own state type.
pub fn api_router<S, C>(store: Arc<S>, caster: Arc<C>) -> Router<()>
where
  S: SchemaStore + 'static,
  C: Caster + 'static,
{
  Router::new()
    // Schemas
    .route("/schemas", get(schemas::list::<S, C>).post(schemas::create::<S, C>))
    .route(
      "/schemas/{name}",
      get(schemas::get_one::<S, C>)
        .put(schemas::rewrite::<S, C>)
        .delete(schemas::delete_one::<S, C>),
    )
    .route("/schemas/{name}/versions", get(schemas::versions::<S, C>))
    // Generation
    .route("/generate/{name}", post(generate::handler::<S, C>))
    // History. `{key}` is a schema name for GET and a generation id
    // otherwise; the router needs one parameter name per position.
    .route("/generations", get(generations::list_all::<S, C>))
    .route(
      "/generations/{key}",
      get(generations::list_for_schema::<S, C>).delete(generations::delete_one::<S, C>),
    )
    .route("/generations/{key}/favorite", put(generations::toggle_favorite::<S, C>))
    .layer(TraceLayer::new_for_http())
    .with_state(ApiState { store, caster })
}

#[cfg(test)]
mod tests;
