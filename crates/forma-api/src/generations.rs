//! Handlers for `/generations` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/generations` | Every generation, newest first, grouped by schema name |
//! | `GET`    | `/generations/{name}` | Optional `?favorites_only=true`; 404 if the schema is absent |
//! | `PUT`    | `/generations/{id}/favorite` | Toggle; returns the updated record |
//! | `DELETE` | `/generations/{id}` | 404 if absent |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, Query, State, rejection::PathRejection},
};
use forma_core::{
  cast::Caster,
  generation::Generation,
  ids::GenerationId,
  store::SchemaStore,
};
use serde::Deserialize;
use serde_json::json;

use crate::{ApiState, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /generations`
pub async fn list_all<S, C>(
  State(state): State<ApiState<S, C>>,
) -> Result<Json<BTreeMap<String, Vec<Generation>>>, ApiError>
where
  S: SchemaStore,
  C: Caster,
{
  let grouped = state
    .store
    .list_all_generations()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(grouped))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub favorites_only: bool,
}

/// `GET /generations/{name}[?favorites_only=true]`
pub async fn list_for_schema<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(name): Path<String>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Generation>>, ApiError>
where
  S: SchemaStore,
  C: Caster,
{
  if state
    .store
    .current_version(&name)
    .await
    .map_err(ApiError::store)?
    .is_none()
  {
    return Err(ApiError::NotFound(format!("schema {name} not found")));
  }

  let generations = state
    .store
    .list_for_schema(&name, params.favorites_only)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(generations))
}

// ─── Favourite ───────────────────────────────────────────────────────────────

/// `PUT /generations/{id}/favorite`
pub async fn toggle_favorite<S, C>(
  State(state): State<ApiState<S, C>>,
  id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Generation>, ApiError>
where
  S: SchemaStore,
  C: Caster,
{
  let Path(id) = id?;
  let generation = state
    .store
    .toggle_favorite(GenerationId::new(id))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(generation))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /generations/{id}`
pub async fn delete_one<S, C>(
  State(state): State<ApiState<S, C>>,
  id: Result<Path<i64>, PathRejection>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: SchemaStore,
  C: Caster,
{
  let Path(id) = id?;
  state
    .store
    .delete_generation(GenerationId::new(id))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "message": format!("Generation {id} deleted successfully") })))
}
