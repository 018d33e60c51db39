//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"type": ..., "message": ...}`.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use forma_core::{Classify, ErrorKind, cast::CastError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  /// The request body or path could not be read as the expected shape, or
  /// a store write was rejected as malformed.
  #[error("invalid request: {0}")]
  Validation(String),

  /// The request was understood but is not allowed, e.g. deleting a
  /// built-in schema.
  #[error("bad request: {0}")]
  BadRequest(String),

  /// The schema changed between read and write; re-read and retry.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("generation failed: {0}")]
  Generation(String),

  /// A cast produced something that is not a usable schema definition.
  #[error("schema error: {0}")]
  Schema(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a store failure onto a response class by its [`ErrorKind`].
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    match e.kind() {
      ErrorKind::NotFound => ApiError::NotFound(e.to_string()),
      ErrorKind::ConstraintViolation => ApiError::Validation(e.to_string()),
      ErrorKind::InvalidOperation => ApiError::BadRequest(e.to_string()),
      ErrorKind::ConcurrentModification => ApiError::Conflict(e.to_string()),
      ErrorKind::Internal => {
        tracing::error!(error = %e, "store failure");
        ApiError::Store(Box::new(e))
      }
    }
  }

  fn error_type(&self) -> &'static str {
    match self {
      ApiError::NotFound(_) => "not_found",
      ApiError::Validation(_) => "validation_error",
      ApiError::BadRequest(_) | ApiError::Schema(_) => "schema_error",
      ApiError::Conflict(_) => "conflict",
      ApiError::Generation(_) => "generation_error",
      ApiError::Store(_) => "database_error",
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Generation(_) | ApiError::Schema(_) | ApiError::Store(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl From<CastError> for ApiError {
  fn from(e: CastError) -> Self {
    tracing::error!(error = %e, "cast failed");
    ApiError::Generation(e.to_string())
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::Validation(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { ApiError::Validation(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let message = match &self {
      ApiError::Store(e) => e.to_string(),
      ApiError::NotFound(m)
      | ApiError::Validation(m)
      | ApiError::BadRequest(m)
      | ApiError::Conflict(m)
      | ApiError::Generation(m)
      | ApiError::Schema(m) => m.clone(),
    };
    (
      self.status(),
      Json(json!({ "type": self.error_type(), "message": message })),
    )
      .into_response()
  }
}
