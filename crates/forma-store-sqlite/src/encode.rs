//! Encoding and decoding helpers between domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, field lists and generation outputs are
//! compact JSON, booleans are 0/1 integers.

use chrono::{DateTime, Utc};
use forma_core::{
  generation::Generation,
  ids::{GenerationId, VersionId},
  schema::{FieldSpec, SchemaVersion},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Fields ──────────────────────────────────────────────────────────────────

pub fn encode_fields(fields: &[FieldSpec]) -> Result<String> {
  Ok(serde_json::to_string(fields)?)
}

pub fn decode_fields(s: &str) -> Result<Vec<FieldSpec>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Version number ──────────────────────────────────────────────────────────

fn decode_version_number(n: i64) -> Result<u32> {
  u32::try_from(n).map_err(|_| Error::Decode(format!("version number {n}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawVersion::from_row`].
pub const VERSION_COLUMNS: &str = "id, name, version, parent_id, description, \
                                   prompt, fields, is_builtin, is_latest, created_at";

/// Raw values read directly from a `schemas` row.
pub struct RawVersion {
  pub id:          i64,
  pub name:        String,
  pub version:     i64,
  pub parent_id:   Option<i64>,
  pub description: String,
  pub prompt:      String,
  pub fields:      String,
  pub is_builtin:  bool,
  pub is_latest:   bool,
  pub created_at:  String,
}

impl RawVersion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      version:     row.get(2)?,
      parent_id:   row.get(3)?,
      description: row.get(4)?,
      prompt:      row.get(5)?,
      fields:      row.get(6)?,
      is_builtin:  row.get(7)?,
      is_latest:   row.get(8)?,
      created_at:  row.get(9)?,
    })
  }

  pub fn into_version(self) -> Result<SchemaVersion> {
    Ok(SchemaVersion {
      id:          VersionId::new(self.id),
      name:        self.name,
      version:     decode_version_number(self.version)?,
      parent_id:   self.parent_id.map(VersionId::new),
      description: self.description,
      prompt:      self.prompt,
      fields:      decode_fields(&self.fields)?,
      is_builtin:  self.is_builtin,
      is_latest:   self.is_latest,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Select list matching [`RawGeneration::from_row`]; joins each generation
/// to the version it was recorded against.
pub const GENERATION_SELECT: &str = "SELECT g.id, s.name, g.schema_id, s.version, \
                                     g.prompt, g.output, g.created_at, g.is_favorite
   FROM generations g
   JOIN schemas s ON s.id = g.schema_id";

/// Raw values read from a `generations` row joined with `schemas`.
pub struct RawGeneration {
  pub id:             i64,
  pub schema_name:    String,
  pub version_id:     i64,
  pub schema_version: i64,
  pub prompt:         String,
  pub output:         String,
  pub created_at:     String,
  pub is_favorite:    bool,
}

impl RawGeneration {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      schema_name:    row.get(1)?,
      version_id:     row.get(2)?,
      schema_version: row.get(3)?,
      prompt:         row.get(4)?,
      output:         row.get(5)?,
      created_at:     row.get(6)?,
      is_favorite:    row.get(7)?,
    })
  }

  pub fn into_generation(self) -> Result<Generation> {
    Ok(Generation {
      id:             GenerationId::new(self.id),
      schema_name:    self.schema_name,
      version_id:     VersionId::new(self.version_id),
      schema_version: decode_version_number(self.schema_version)?,
      prompt:         self.prompt,
      output:         serde_json::from_str(&self.output)?,
      created_at:     decode_dt(&self.created_at)?,
      is_favorite:    self.is_favorite,
    })
  }
}
