//! Handlers for `/schemas` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/schemas` | Every current schema, keyed by name |
//! | `POST`   | `/schemas` | Body: a schema definition, optional `base_version`; creates or appends a version; 201 |
//! | `GET`    | `/schemas/{name}` | Current definition; 404 if absent |
//! | `PUT`    | `/schemas/{name}` | Body: `{"prompt":"..."}`; rewrites the schema through a cast |
//! | `DELETE` | `/schemas/{name}` | 400 for built-ins, 404 if absent |
//! | `GET`    | `/schemas/{name}/versions` | History, newest first; 404 if absent |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use forma_core::{
  builtin,
  cast::{CastRequest, Caster},
  ids::VersionId,
  schema::{FieldSpec, FieldType, SchemaDefinition, SchemaVersion},
  store::SchemaStore,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{ApiState, PromptBody, error::ApiError};

// ─── Views ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PropertyView {
  #[serde(rename = "type")]
  pub field_type:  FieldType,
  pub description: String,
}

/// One entry of `GET /schemas`: the definition laid out like a JSON Schema
/// object, with fields keyed by name.
#[derive(Debug, Serialize)]
pub struct SchemaSummary {
  pub title:       String,
  pub description: String,
  pub prompt:      String,
  pub is_builtin:  bool,
  pub properties:  BTreeMap<String, PropertyView>,
}

impl From<SchemaDefinition> for SchemaSummary {
  fn from(def: SchemaDefinition) -> Self {
    // A repeated field name keeps its last occurrence.
    let properties = def
      .fields
      .into_iter()
      .map(|f| {
        (f.name, PropertyView {
          field_type:  f.field_type,
          description: f.description,
        })
      })
      .collect();
    Self {
      title: def.name,
      description: def.description,
      prompt: def.prompt,
      is_builtin: def.is_builtin,
      properties,
    }
  }
}

/// One entry of `GET /schemas/{name}/versions`.
#[derive(Debug, Serialize)]
pub struct VersionView {
  pub id:                VersionId,
  pub version:           u32,
  pub description:       String,
  pub prompt:            String,
  pub fields:            Vec<FieldSpec>,
  pub parent_version_id: Option<VersionId>,
  pub is_builtin:        bool,
  pub is_latest:         bool,
  pub created_at:        DateTime<Utc>,
}

impl From<SchemaVersion> for VersionView {
  fn from(v: SchemaVersion) -> Self {
    Self {
      id:                v.id,
      version:           v.version,
      description:       v.description,
      prompt:            v.prompt,
      fields:            v.fields,
      parent_version_id: v.parent_id,
      is_builtin:        v.is_builtin,
      is_latest:         v.is_latest,
      created_at:        v.created_at,
    }
  }
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /schemas`
pub async fn list<S, C>(
  State(state): State<ApiState<S, C>>,
) -> Result<Json<BTreeMap<String, SchemaSummary>>, ApiError>
where
  S: SchemaStore,
  C: Caster,
{
  let all = state.store.get_all().await.map_err(ApiError::store)?;
  Ok(Json(
    all
      .into_iter()
      .map(|(name, def)| (name, SchemaSummary::from(def)))
      .collect(),
  ))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /schemas/{name}`
pub async fn get_one<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(name): Path<String>,
) -> Result<Json<SchemaDefinition>, ApiError>
where
  S: SchemaStore,
  C: Caster,
{
  let def = state
    .store
    .get(&name)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("schema {name} not found")))?;
  Ok(Json(def))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// JSON body of `POST /schemas`: a [`SchemaDefinition`], optionally with
/// the version number the client edited.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(flatten)]
  pub definition:   SchemaDefinition,
  /// When set, the write only succeeds if this is still the current
  /// version; otherwise 409 and nothing is written.
  #[serde(default)]
  pub base_version: Option<u32>,
}

/// `POST /schemas` — body: [`CreateBody`]. Returns 201 and the stored
/// version.
///
/// `is_builtin` in the body is ignored: schemas created over HTTP are user
/// schemas, and an existing schema keeps its stored flag anyway.
pub async fn create<S, C>(
  State(state): State<ApiState<S, C>>,
  body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchemaStore,
  C: Caster,
{
  let Json(CreateBody {
    definition: mut def,
    base_version,
  }) = body?;
  require_name(&def).map_err(ApiError::Validation)?;
  def.is_builtin = false;

  let version = match base_version {
    Some(base) => state.store.create_from(def, Some(base)).await,
    None => state.store.create(def).await,
  }
  .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(version)))
}

// ─── Rewrite ─────────────────────────────────────────────────────────────────

/// `PUT /schemas/{name}` — body: `{"prompt":"..."}`.
///
/// Casts the current definition into a new one using the prompt as
/// instructions, then appends it on top of the version that was read. If
/// another writer got there first the response is 409 and nothing is
/// written.
pub async fn rewrite<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(name): Path<String>,
  body: Result<Json<PromptBody>, JsonRejection>,
) -> Result<Json<SchemaDefinition>, ApiError>
where
  S: SchemaStore,
  C: Caster,
{
  let Json(body) = body?;
  let current = state
    .store
    .current_version(&name)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("schema {name} not found")))?;

  tracing::info!(schema = %name, prompt = %body.prompt, "rewriting schema");

  let text = serde_json::to_string(&current.definition())
    .map_err(|e| ApiError::Schema(e.to_string()))?;
  let request = CastRequest::new(text, builtin::new_schema())
    .with_instructions(format!("{} - keep the name as '{name}'", body.prompt));
  let output = state.caster.cast(request).await?;

  let mut def = decode_definition(output)?;
  def.name = name;

  let version = state
    .store
    .create_from(def, Some(current.version))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(version.definition()))
}

/// Read a cast output as a schema definition. The result is always a user
/// schema; whether it ends up built-in is decided by the store.
///
/// The name is not checked here since a rewrite replaces it; a caller that
/// keeps the cast's name runs [`require_name`] itself.
pub(crate) fn decode_definition(output: serde_json::Value) -> Result<SchemaDefinition, ApiError> {
  let mut def: SchemaDefinition = serde_json::from_value(output)
    .map_err(|e| ApiError::Schema(format!("cast output is not a schema definition: {e}")))?;
  def.is_builtin = false;
  Ok(def)
}

/// A schema name must contain something other than whitespace.
pub(crate) fn require_name(def: &SchemaDefinition) -> Result<(), String> {
  if def.name.trim().is_empty() {
    return Err("schema name must not be empty".to_owned());
  }
  Ok(())
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /schemas/{name}`
pub async fn delete_one<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: SchemaStore,
  C: Caster,
{
  state.store.delete(&name).await.map_err(ApiError::store)?;
  Ok(Json(json!({ "message": format!("Schema {name} deleted successfully") })))
}

// ─── Versions ────────────────────────────────────────────────────────────────

/// `GET /schemas/{name}/versions`
pub async fn versions<S, C>(
  State(state): State<ApiState<S, C>>,
  Path(name): Path<String>,
) -> Result<Json<Vec<VersionView>>, ApiError>
where
  S: SchemaStore,
  C: Caster,
{
  let versions = state
    .store
    .list_versions(&name)
    .await
    .map_err(ApiError::store)?;
  if versions.is_empty() {
    return Err(ApiError::NotFound(format!("schema {name} not found")));
  }
  Ok(Json(versions.into_iter().map(VersionView::from).collect()))
}
