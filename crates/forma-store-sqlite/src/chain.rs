//! The version chain: resolving the current version of a schema and
//! appending a new one.
//!
//! Every version of a name is its own `schemas` row. Version 1 has no
//! parent; each later version points at the row it superseded. Exactly one
//! row per name carries `is_latest = 1`, and the partial unique index
//! `schemas_one_latest_idx` makes the database refuse a second.
//!
//! All functions must run inside a transaction supplied by the caller. An
//! append is three statements (insert, clear the old flag, set the new one)
//! and only the transaction makes them a single step.

use chrono::Utc;
use forma_core::schema::{SchemaDefinition, SchemaVersion};
use rusqlite::Connection;

use crate::{
  Error, Result,
  entity::{self, NewVersionRow, VersionQuery},
};

/// What the writer believes the current version to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
  /// Whatever is current inside this transaction.
  Current,
  /// The version number the caller observed earlier, `None` meaning the
  /// schema did not exist.
  Observed(Option<u32>),
}

fn concurrent(name: &str, expected: Option<u32>, found: Option<u32>) -> Error {
  forma_core::Error::ConcurrentModification {
    name: name.to_owned(),
    expected,
    found,
  }
  .into()
}

/// The current version of `name`, or `None` if no schema has that name.
///
/// If more than one row is flagged current (which the unique index should
/// make impossible) the highest version wins.
pub fn resolve_current(conn: &Connection, name: &str) -> Result<Option<SchemaVersion>> {
  Ok(entity::query_versions(conn, VersionQuery::LatestByName(name))?.into_iter().next())
}

/// Every version of `name`, newest first.
pub fn list_versions(conn: &Connection, name: &str) -> Result<Vec<SchemaVersion>> {
  entity::query_versions(conn, VersionQuery::ByName(name))
}

/// Append `definition` as the next version of `definition.name` and make it
/// current.
///
/// A brand-new schema takes `is_builtin` from the definition. An existing one
/// keeps the flag of its current version, whatever the definition says.
///
/// Fails with `ConcurrentModification` when `base` names a version other than
/// the current one, or when the previous current row lost its flag (or a
/// competing current row appeared) between resolving and repointing.
pub fn append_version(
  conn: &Connection,
  definition: &SchemaDefinition,
  base: Base,
) -> Result<SchemaVersion> {
  let name = definition.name.as_str();
  let previous = resolve_current(conn, name)?;
  let found = previous.as_ref().map(|p| p.version);

  if let Base::Observed(expected) = base
    && expected != found
  {
    return Err(concurrent(name, expected, found));
  }

  let version = found.map_or(1, |v| v + 1);
  let is_builtin = previous.as_ref().map_or(definition.is_builtin, |p| p.is_builtin);

  // Inserted unflagged so the old current row and the new one never coexist
  // as current, even within the transaction.
  let id = entity::insert_version(conn, &NewVersionRow {
    name,
    version,
    parent_id: previous.as_ref().map(|p| p.id),
    description: &definition.description,
    prompt: &definition.prompt,
    fields: &definition.fields,
    is_builtin,
    is_latest: false,
    created_at: Utc::now(),
  })
  .map_err(|e| match e {
    // (name, version) already taken: someone appended the same number.
    Error::Core(forma_core::Error::ConstraintViolation(_)) => {
      concurrent(name, found, Some(version))
    }
    other => other,
  })?;

  if let Some(prev) = &previous
    && !entity::clear_latest(conn, prev.id)?
  {
    return Err(concurrent(name, found, None));
  }

  entity::mark_latest(conn, id).map_err(|e| match e {
    Error::Core(forma_core::Error::ConstraintViolation(_)) => concurrent(name, found, None),
    other => other,
  })?;

  entity::get_version(conn, id)?.ok_or_else(|| forma_core::Error::VersionNotFound(id).into())
}
