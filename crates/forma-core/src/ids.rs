//! Typed row identifiers.
//!
//! Both wrap the SQLite `INTEGER PRIMARY KEY` of their table so a version id
//! cannot be passed where a generation id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one schema version row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VersionId(i64);

impl VersionId {
  pub fn new(id: i64) -> Self { Self(id) }

  pub fn get(self) -> i64 { self.0 }
}

impl fmt::Display for VersionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Identifies one generation row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GenerationId(i64);

impl GenerationId {
  pub fn new(id: i64) -> Self { Self(id) }

  pub fn get(self) -> i64 { self.0 }
}

impl fmt::Display for GenerationId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}
