//! Error type for `forma-store-sqlite`.

use forma_core::{Classify, ErrorKind};
use rusqlite::ffi;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A failure from the store's own taxonomy: not found, constraint,
  /// invalid operation, or a lost version race.
  #[error(transparent)]
  Core(#[from] forma_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A row whose stored values cannot be represented in the domain types.
  #[error("corrupt row: {0}")]
  Decode(String),
}

/// Constraint failures are lifted into the core taxonomy here so that every
/// statement, not just the ones with explicit checks, reports them uniformly.
/// Trigger aborts are policy violations; every other constraint is a
/// referential or uniqueness problem with the write itself.
impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    if let rusqlite::Error::SqliteFailure(failure, msg) = &e
      && failure.code == rusqlite::ErrorCode::ConstraintViolation
    {
      let msg = msg.clone().unwrap_or_else(|| e.to_string());
      return if failure.extended_code == ffi::SQLITE_CONSTRAINT_TRIGGER {
        Error::Core(forma_core::Error::InvalidOperation(msg))
      } else {
        Error::Core(forma_core::Error::ConstraintViolation(msg))
      };
    }
    Error::Sqlite(e)
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Error::Core(e) => e.kind(),
      _ => ErrorKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
