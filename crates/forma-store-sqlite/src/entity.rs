//! Row-level primitives over the `schemas` and `generations` tables.
//!
//! Every function takes a plain [`rusqlite::Connection`]; callers pass a
//! [`rusqlite::Transaction`] (which derefs to one) and own the commit. Nothing
//! here commits on its own.
//!
//! Id-addressed writes report a missing row as the matching `*NotFound` core
//! error. Constraint failures arrive as `ConstraintViolation`, or
//! `InvalidOperation` when a protective trigger fired.

use chrono::{DateTime, Utc};
use forma_core::{
  generation::Generation,
  ids::{GenerationId, VersionId},
  schema::{FieldSpec, SchemaVersion},
};
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::{
  Error, Result,
  encode::{GENERATION_SELECT, RawGeneration, RawVersion, VERSION_COLUMNS, encode_dt, encode_fields},
};

// ─── Schema versions ─────────────────────────────────────────────────────────

/// Values for a new `schemas` row. The id is assigned by SQLite.
#[derive(Debug)]
pub struct NewVersionRow<'a> {
  pub name:        &'a str,
  pub version:     u32,
  pub parent_id:   Option<VersionId>,
  pub description: &'a str,
  pub prompt:      &'a str,
  pub fields:      &'a [FieldSpec],
  pub is_builtin:  bool,
  pub is_latest:   bool,
  pub created_at:  DateTime<Utc>,
}

/// Which version rows to read.
#[derive(Debug, Clone, Copy)]
pub enum VersionQuery<'a> {
  /// Every version of one name, newest first.
  ByName(&'a str),
  /// The row(s) of one name flagged current, highest version first.
  LatestByName(&'a str),
  /// The current row of every name, ordered by name.
  AllLatest,
}

pub fn insert_version(conn: &Connection, row: &NewVersionRow<'_>) -> Result<VersionId> {
  conn.execute(
    "INSERT INTO schemas (
       name, version, parent_id, description, prompt,
       fields, is_builtin, is_latest, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    params![
      row.name,
      row.version,
      row.parent_id.map(VersionId::get),
      row.description,
      row.prompt,
      encode_fields(row.fields)?,
      row.is_builtin,
      row.is_latest,
      encode_dt(row.created_at),
    ],
  )?;
  Ok(VersionId::new(conn.last_insert_rowid()))
}

pub fn get_version(conn: &Connection, id: VersionId) -> Result<Option<SchemaVersion>> {
  let raw = conn
    .query_row(
      &format!("SELECT {VERSION_COLUMNS} FROM schemas WHERE id = ?1"),
      params![id.get()],
      RawVersion::from_row,
    )
    .optional()?;
  raw.map(RawVersion::into_version).transpose()
}

pub fn query_versions(conn: &Connection, query: VersionQuery<'_>) -> Result<Vec<SchemaVersion>> {
  let (filter, name) = match query {
    VersionQuery::ByName(name) => ("WHERE name = ?1 ORDER BY version DESC", Some(name)),
    VersionQuery::LatestByName(name) => {
      ("WHERE name = ?1 AND is_latest = 1 ORDER BY version DESC", Some(name))
    }
    VersionQuery::AllLatest => ("WHERE is_latest = 1 ORDER BY name, version DESC", None),
  };

  let mut stmt = conn.prepare(&format!("SELECT {VERSION_COLUMNS} FROM schemas {filter}"))?;
  let raws = match name {
    Some(name) => stmt.query_map(params![name], RawVersion::from_row)?,
    None => stmt.query_map([], RawVersion::from_row)?,
  }
  .collect::<rusqlite::Result<Vec<_>>>()?;

  raws.into_iter().map(RawVersion::into_version).collect()
}

/// Clear the current flag on `id`, but only if it is still set. Returns
/// `false` when the row was not current (or does not exist), which the
/// version chain treats as a lost race.
pub fn clear_latest(conn: &Connection, id: VersionId) -> Result<bool> {
  let changed = conn.execute(
    "UPDATE schemas SET is_latest = 0 WHERE id = ?1 AND is_latest = 1",
    params![id.get()],
  )?;
  Ok(changed == 1)
}

/// Flag `id` as current. Fails with a constraint violation if another row of
/// the same name is already current.
pub fn mark_latest(conn: &Connection, id: VersionId) -> Result<()> {
  let changed = conn.execute("UPDATE schemas SET is_latest = 1 WHERE id = ?1", params![id.get()])?;
  if changed == 0 {
    return Err(forma_core::Error::VersionNotFound(id).into());
  }
  Ok(())
}

/// Delete every version of `name`; generations go with them through the
/// foreign key's `ON DELETE CASCADE`. Returns the number of versions removed.
pub fn delete_versions(conn: &Connection, name: &str) -> Result<usize> {
  Ok(conn.execute("DELETE FROM schemas WHERE name = ?1", params![name])?)
}

// ─── Generations ─────────────────────────────────────────────────────────────

/// Values for a new `generations` row.
#[derive(Debug)]
pub struct NewGenerationRow<'a> {
  pub version_id: VersionId,
  pub prompt:     &'a str,
  pub output:     &'a serde_json::Value,
  pub created_at: DateTime<Utc>,
}

/// Which generations to read. Results are always newest first.
#[derive(Debug, Clone, Copy)]
pub enum GenerationQuery<'a> {
  BySchema { name: &'a str, favorites_only: bool },
  All,
}

pub fn insert_generation(conn: &Connection, row: &NewGenerationRow<'_>) -> Result<GenerationId> {
  conn.execute(
    "INSERT INTO generations (schema_id, prompt, output, created_at, is_favorite)
     VALUES (?1, ?2, ?3, ?4, 0)",
    params![
      row.version_id.get(),
      row.prompt,
      row.output.to_string(),
      encode_dt(row.created_at),
    ],
  )?;
  Ok(GenerationId::new(conn.last_insert_rowid()))
}

pub fn get_generation(conn: &Connection, id: GenerationId) -> Result<Option<Generation>> {
  let raw = conn
    .query_row(
      &format!("{GENERATION_SELECT} WHERE g.id = ?1"),
      params![id.get()],
      RawGeneration::from_row,
    )
    .optional()?;
  raw.map(RawGeneration::into_generation).transpose()
}

pub fn query_generations(conn: &Connection, query: GenerationQuery<'_>) -> Result<Vec<Generation>> {
  let raws = match query {
    GenerationQuery::BySchema { name, favorites_only } => {
      let favorites = if favorites_only { "AND g.is_favorite = 1" } else { "" };
      let mut stmt = conn.prepare(&format!(
        "{GENERATION_SELECT} WHERE s.name = ?1 {favorites} ORDER BY g.id DESC"
      ))?;
      stmt
        .query_map(params![name], RawGeneration::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?
    }
    GenerationQuery::All => {
      let mut stmt = conn.prepare(&format!("{GENERATION_SELECT} ORDER BY g.id DESC"))?;
      stmt
        .query_map([], RawGeneration::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?
    }
  };

  raws.into_iter().map(RawGeneration::into_generation).collect()
}

/// Number of generations recorded against any version of `name`.
pub fn count_generations(conn: &Connection, name: &str) -> Result<usize> {
  let n: i64 = conn.query_row(
    "SELECT COUNT(*) FROM generations g JOIN schemas s ON s.id = g.schema_id WHERE s.name = ?1",
    params![name],
    |r| r.get(0),
  )?;
  usize::try_from(n).map_err(|_| Error::Decode(format!("generation count {n}")))
}

/// Set the favourite flag, the only mutable column of a generation.
pub fn set_favorite(conn: &Connection, id: GenerationId, is_favorite: bool) -> Result<()> {
  let changed = conn.execute(
    "UPDATE generations SET is_favorite = ?2 WHERE id = ?1",
    params![id.get(), is_favorite],
  )?;
  if changed == 0 {
    return Err(forma_core::Error::GenerationNotFound(id).into());
  }
  Ok(())
}

pub fn delete_generation(conn: &Connection, id: GenerationId) -> Result<()> {
  let changed = conn.execute("DELETE FROM generations WHERE id = ?1", params![id.get()])?;
  if changed == 0 {
    return Err(forma_core::Error::GenerationNotFound(id).into());
  }
  Ok(())
}
