//! Error types for `forma-core`.

use thiserror::Error;

use crate::ids::{GenerationId, VersionId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("schema not found: {0}")]
  SchemaNotFound(String),

  #[error("schema version not found: {0}")]
  VersionNotFound(VersionId),

  #[error("generation not found: {0}")]
  GenerationNotFound(GenerationId),

  #[error("constraint violation: {0}")]
  ConstraintViolation(String),

  #[error("invalid operation: {0}")]
  InvalidOperation(String),

  /// The current version of `name` was not the one the writer started from.
  /// The caller should re-read and retry.
  #[error(
    "schema {name:?} was modified concurrently (expected version {}, found {})",
    display_version(.expected),
    display_version(.found)
  )]
  ConcurrentModification {
    name:     String,
    expected: Option<u32>,
    found:    Option<u32>,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

fn display_version(v: &Option<u32>) -> String {
  v.map_or_else(|| "none".to_owned(), |v| v.to_string())
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// The failure taxonomy surfaced to callers of a [`SchemaStore`].
///
/// [`SchemaStore`]: crate::store::SchemaStore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// A referenced name or id is absent.
  NotFound,
  /// A malformed or referentially invalid write.
  ConstraintViolation,
  /// A policy violation, e.g. deleting a built-in schema.
  InvalidOperation,
  /// An optimistic version race was lost; retry.
  ConcurrentModification,
  /// Anything else: I/O, encoding, a closed connection.
  Internal,
}

/// Implemented by every error type a store backend returns, so that callers
/// can react to the taxonomy without knowing the backend.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::SchemaNotFound(_)
      | Self::VersionNotFound(_)
      | Self::GenerationNotFound(_) => ErrorKind::NotFound,
      Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
      Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
      Self::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
      Self::Serialization(_) => ErrorKind::Internal,
    }
  }
}
