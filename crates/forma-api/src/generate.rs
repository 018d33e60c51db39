//! `POST /generate/{name}` — cast free text into a record of a schema's
//! current shape and keep it in the schema's history.
//!
//! The version is resolved once, before the cast, and the generation is
//! recorded against that version even if the schema moves on meanwhile.
//! Generating against the `NewSchema` built-in yields a schema definition,
//! which is created (or appended) as a side effect.

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
};
use forma_core::{
  builtin,
  cast::{CastRequest, Caster},
  generation::NewGeneration,
  store::SchemaStore,
};

use crate::{ApiState, PromptBody, error::ApiError, schemas::{decode_definition, require_name}};

/// `POST /generate/{name}` — body: `{"prompt":"..."}`. Returns the cast
/// output.
pub async fn handler<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(name): Path<String>,
  body: Result<Json<PromptBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: SchemaStore,
  C: Caster,
{
  let Json(body) = body?;
  let version = state
    .store
    .current_version(&name)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("schema {name} not found")))?;

  let mut request = CastRequest::new(body.prompt.clone(), version.definition());
  if name == builtin::NEW_SCHEMA {
    request = request.with_instructions(builtin::NEW_SCHEMA_INSTRUCTIONS);
  }
  let mut output = state.caster.cast(request).await?;

  if name == builtin::NEW_SCHEMA {
    let def = decode_definition(output)?;
    require_name(&def).map_err(ApiError::Schema)?;
    let created = state.store.create(def).await.map_err(ApiError::store)?;
    tracing::info!(
      schema = %created.name,
      version = created.version,
      "created schema from prompt"
    );
    output = serde_json::to_value(created.definition())
      .map_err(|e| ApiError::Schema(e.to_string()))?;
  }

  // The caller gets the output even if it cannot be kept.
  let record = NewGeneration::new(name.as_str(), version.id, body.prompt, output.clone());
  if let Err(e) = state.store.record(record).await {
    tracing::error!(
      schema = %name,
      version_id = %version.id,
      error = %e,
      "failed to record generation"
    );
  }

  Ok(Json(output))
}
