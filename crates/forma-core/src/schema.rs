//! Schema types — named record shapes and their immutable versions.
//!
//! A schema is identified by its `name`. Every change to its content produces
//! a new [`SchemaVersion`]; exactly one version per name is current at any
//! time, and versions are numbered contiguously from 1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::VersionId;

// ─── Fields ──────────────────────────────────────────────────────────────────

/// The value type a field is expected to hold in a generated record.
///
/// Only a tag as far as the store is concerned; mapping it to a concrete
/// type is up to the casting capability. Tags outside the known set are
/// kept verbatim in [`FieldType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
  String,
  Integer,
  Boolean,
  Number,
  List,
  Dict,
  #[serde(untagged)]
  Other(String),
}

/// One field of a schema. Field names are not required to be unique within
/// a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
  pub name:        String,
  #[serde(rename = "type")]
  pub field_type:  FieldType,
  pub description: String,
}

impl FieldSpec {
  pub fn new(
    name: impl Into<String>,
    field_type: FieldType,
    description: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      field_type,
      description: description.into(),
    }
  }
}

// ─── Definition ──────────────────────────────────────────────────────────────

/// The caller-facing content of a schema: what `create` accepts and `get`
/// returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
  /// e.g. "Location", "Person", "Movie".
  pub name:        String,
  pub description: String,
  /// Short question shown to a user to elicit text for this shape.
  pub prompt:      String,
  /// Ordered; may be empty.
  pub fields:      Vec<FieldSpec>,
  /// Only honoured when a schema is first created (the seeding path). Once a
  /// schema exists its stored flag wins.
  #[serde(default)]
  pub is_builtin:  bool,
}

// ─── Version ─────────────────────────────────────────────────────────────────

/// One immutable snapshot of a schema's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
  pub id:          VersionId,
  pub name:        String,
  /// 1-based, contiguous per name.
  pub version:     u32,
  /// The version this one superseded; `None` only for version 1.
  pub parent_id:   Option<VersionId>,
  pub description: String,
  pub prompt:      String,
  pub fields:      Vec<FieldSpec>,
  pub is_builtin:  bool,
  pub is_latest:   bool,
  pub created_at:  DateTime<Utc>,
}

impl SchemaVersion {
  /// The content of this version as a [`SchemaDefinition`].
  pub fn definition(&self) -> SchemaDefinition {
    SchemaDefinition {
      name:        self.name.clone(),
      description: self.description.clone(),
      prompt:      self.prompt.clone(),
      fields:      self.fields.clone(),
      is_builtin:  self.is_builtin,
    }
  }
}
