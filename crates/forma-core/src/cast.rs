//! The structured-output capability the store's callers depend on.
//!
//! A [`Caster`] turns free text into a JSON record shaped like a target
//! schema. How it does so is the implementation's business; the store only
//! ever sees the resulting payload.

use std::future::Future;

use serde::Serialize;
use thiserror::Error;

use crate::schema::SchemaDefinition;

#[derive(Debug, Error)]
pub enum CastError {
  /// The capability answered but could not produce a record of the target
  /// shape from the input.
  #[error("could not cast input: {0}")]
  Unparseable(String),

  /// The capability could not be reached or failed outright.
  #[error("cast capability unavailable: {0}")]
  Unavailable(String),
}

/// One cast invocation.
#[derive(Debug, Clone, Serialize)]
pub struct CastRequest {
  pub text:         String,
  /// The shape the output must follow.
  pub target:       SchemaDefinition,
  pub instructions: Option<String>,
}

impl CastRequest {
  pub fn new(text: impl Into<String>, target: SchemaDefinition) -> Self {
    Self {
      text: text.into(),
      target,
      instructions: None,
    }
  }

  pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
    self.instructions = Some(instructions.into());
    self
  }
}

pub trait Caster: Send + Sync {
  /// Cast `request.text` into a record of `request.target`'s shape.
  fn cast(
    &self,
    request: CastRequest,
  ) -> impl Future<Output = Result<serde_json::Value, CastError>> + Send + '_;
}
