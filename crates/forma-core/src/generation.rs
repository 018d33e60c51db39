//! Generation records — one per successful cast, pinned to the exact schema
//! version that shaped it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{GenerationId, VersionId};

/// A recorded generation as returned by the store.
///
/// `version_id` and `schema_version` describe the version the output was
/// produced against and never change, however many versions the schema
/// gains afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
  pub id:             GenerationId,
  pub schema_name:    String,
  pub version_id:     VersionId,
  /// The version number of `version_id`, joined at read time.
  pub schema_version: u32,
  /// The literal input text.
  pub prompt:         String,
  /// The structured record produced by the cast; opaque to the store.
  pub output:         serde_json::Value,
  pub created_at:     DateTime<Utc>,
  pub is_favorite:    bool,
}

/// Input to [`crate::store::SchemaStore::record`].
/// `created_at` is always set by the store.
#[derive(Debug, Clone)]
pub struct NewGeneration {
  pub schema_name: String,
  /// The version resolved as current when the cast was requested.
  pub version_id:  VersionId,
  pub prompt:      String,
  pub output:      serde_json::Value,
}

impl NewGeneration {
  pub fn new(
    schema_name: impl Into<String>,
    version_id: VersionId,
    prompt: impl Into<String>,
    output: serde_json::Value,
  ) -> Self {
    Self {
      schema_name: schema_name.into(),
      version_id,
      prompt: prompt.into(),
      output,
    }
  }
}
