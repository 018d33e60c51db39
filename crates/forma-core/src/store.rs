//! The `SchemaStore` trait and its supporting result types.
//!
//! The trait is implemented by storage backends (e.g. `forma-store-sqlite`).
//! Higher layers (`forma-api`, `forma-server`) depend on this abstraction,
//! not on any concrete backend, and never see how versions are laid out on
//! disk.

use std::{collections::BTreeMap, future::Future};

use crate::{
  Classify,
  generation::{Generation, NewGeneration},
  ids::{GenerationId, VersionId},
  schema::{SchemaDefinition, SchemaVersion},
};

// ─── Seeding report ──────────────────────────────────────────────────────────

/// Outcome of [`SchemaStore::ensure_builtins_seeded`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
  /// Names for which version 1 was inserted by this call.
  pub inserted: Vec<String>,
  /// Names that already had a live schema and were left untouched.
  pub skipped:  Vec<String>,
  /// Names whose insertion failed, with the error message. Already logged.
  pub failed:   Vec<(String, String)>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a schema/generation store backend.
///
/// Every method runs as a single transaction. Version rows are append-only:
/// changing a schema means appending a version and moving the current
/// pointer in the same transaction.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SchemaStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Schemas — reads ───────────────────────────────────────────────────

  /// The current definition of every live schema, keyed by name.
  fn get_all(
    &self,
  ) -> impl Future<Output = Result<BTreeMap<String, SchemaDefinition>, Self::Error>>
  + Send
  + '_;

  /// The current definition of `name`, or `None`.
  fn get<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<SchemaDefinition>, Self::Error>>
  + Send
  + 'a;

  /// The full current version record of `name`, or `None`. Callers pass its
  /// `id` to [`SchemaStore::record`].
  fn current_version<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<SchemaVersion>, Self::Error>> + Send + 'a;

  /// Any version by id, current or not.
  fn get_version(
    &self,
    id: VersionId,
  ) -> impl Future<Output = Result<Option<SchemaVersion>, Self::Error>> + Send + '_;

  /// Every version of `name`, newest first. Empty when the schema does not
  /// exist.
  fn list_versions<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Vec<SchemaVersion>, Self::Error>> + Send + 'a;

  // ── Schemas — writes ──────────────────────────────────────────────────

  /// Create `definition.name` at version 1, or append the next version on
  /// top of whatever is current when the transaction runs.
  ///
  /// `is_builtin` is taken from the definition only for a brand-new schema;
  /// an existing schema keeps its stored flag.
  fn create(
    &self,
    definition: SchemaDefinition,
  ) -> impl Future<Output = Result<SchemaVersion, Self::Error>> + Send + '_;

  /// Like [`SchemaStore::create`], but only if the current version number is
  /// still `base` (`None` meaning "no schema of that name"). Otherwise fails
  /// with a concurrent-modification error and writes nothing.
  fn create_from(
    &self,
    definition: SchemaDefinition,
    base: Option<u32>,
  ) -> impl Future<Output = Result<SchemaVersion, Self::Error>> + Send + '_;

  /// Delete every version of `name` and every generation recorded against
  /// any of them. Fails if the schema is built-in or does not exist.
  fn delete<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Insert version 1 of each definition, flagged built-in, unless a schema
  /// of that name already exists. Never overwrites. A failure on one
  /// definition is logged and reported but does not stop the others.
  fn ensure_builtins_seeded<'a>(
    &'a self,
    definitions: &'a [SchemaDefinition],
  ) -> impl Future<Output = Result<SeedReport, Self::Error>> + Send + 'a;

  // ── Generations ───────────────────────────────────────────────────────

  /// Append a generation against `input.version_id`. Fails if that version
  /// does not exist or does not belong to `input.schema_name`.
  fn record(
    &self,
    input: NewGeneration,
  ) -> impl Future<Output = Result<Generation, Self::Error>> + Send + '_;

  /// Generations recorded against any version of `name`, newest first.
  fn list_for_schema<'a>(
    &'a self,
    name: &'a str,
    favorites_only: bool,
  ) -> impl Future<Output = Result<Vec<Generation>, Self::Error>> + Send + 'a;

  /// Every generation, newest first, grouped by schema name.
  fn list_all_generations(
    &self,
  ) -> impl Future<Output = Result<BTreeMap<String, Vec<Generation>>, Self::Error>>
  + Send
  + '_;

  /// Flip `is_favorite` and return the updated record.
  fn toggle_favorite(
    &self,
    id: GenerationId,
  ) -> impl Future<Output = Result<Generation, Self::Error>> + Send + '_;

  fn delete_generation(
    &self,
    id: GenerationId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
