//! [`SqliteStore`] — the SQLite implementation of [`SchemaStore`].

use std::{collections::BTreeMap, path::Path};

use chrono::Utc;
use forma_core::{
  generation::{Generation, NewGeneration},
  ids::{GenerationId, VersionId},
  schema::{SchemaDefinition, SchemaVersion},
  store::{SchemaStore, SeedReport},
};
use rusqlite::{Transaction, TransactionBehavior};

use crate::{
  Result,
  chain::{self, Base},
  entity::{self, GenerationQuery, NewGenerationRow, VersionQuery},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A forma store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Clones share
/// one connection and therefore one writer; separate [`SqliteStore::open`]
/// calls on the same file get separate connections and coordinate through
/// SQLite's locking.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside one transaction on the connection thread. The
  /// transaction commits if `f` succeeds and rolls back (on drop) otherwise.
  ///
  /// Writers take the database lock up front (`BEGIN IMMEDIATE`) so that the
  /// state they read is still the state they write against.
  async fn transact<T, F>(&self, behavior: TransactionBehavior, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let run = || -> Result<T> {
          let tx = conn.transaction_with_behavior(behavior)?;
          let out = f(&tx)?;
          tx.commit()?;
          Ok(out)
        };
        Ok(run())
      })
      .await?
  }

  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self.transact(TransactionBehavior::Deferred, f).await
  }

  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self.transact(TransactionBehavior::Immediate, f).await
  }

  async fn append(&self, definition: SchemaDefinition, base: Base) -> Result<SchemaVersion> {
    let version = self
      .write(move |tx| chain::append_version(tx, &definition, base))
      .await?;
    tracing::info!(
      schema = %version.name,
      version = version.version,
      version_id = %version.id,
      builtin = version.is_builtin,
      "appended schema version"
    );
    Ok(version)
  }
}

// ─── SchemaStore impl ────────────────────────────────────────────────────────

impl SchemaStore for SqliteStore {
  type Error = crate::Error;

  // ── Schemas — reads ───────────────────────────────────────────────────────

  async fn get_all(&self) -> Result<BTreeMap<String, SchemaDefinition>> {
    let current = self
      .read(|tx| entity::query_versions(tx, VersionQuery::AllLatest))
      .await?;
    Ok(
      current
        .into_iter()
        .map(|v| (v.name.clone(), v.definition()))
        .collect(),
    )
  }

  async fn get(&self, name: &str) -> Result<Option<SchemaDefinition>> {
    Ok(
      self
        .current_version(name)
        .await?
        .map(|v| v.definition()),
    )
  }

  async fn current_version(&self, name: &str) -> Result<Option<SchemaVersion>> {
    let name = name.to_owned();
    self.read(move |tx| chain::resolve_current(tx, &name)).await
  }

  async fn get_version(&self, id: VersionId) -> Result<Option<SchemaVersion>> {
    self.read(move |tx| entity::get_version(tx, id)).await
  }

  async fn list_versions(&self, name: &str) -> Result<Vec<SchemaVersion>> {
    let name = name.to_owned();
    self.read(move |tx| chain::list_versions(tx, &name)).await
  }

  // ── Schemas — writes ──────────────────────────────────────────────────────

  async fn create(&self, definition: SchemaDefinition) -> Result<SchemaVersion> {
    self.append(definition, Base::Current).await
  }

  async fn create_from(
    &self,
    definition: SchemaDefinition,
    base: Option<u32>,
  ) -> Result<SchemaVersion> {
    self.append(definition, Base::Observed(base)).await
  }

  async fn delete(&self, name: &str) -> Result<()> {
    let owned = name.to_owned();
    let (versions, generations) = self
      .write(move |tx| {
        let name = owned.as_str();
        let versions = entity::query_versions(tx, VersionQuery::ByName(name))?;
        if versions.is_empty() {
          return Err(forma_core::Error::SchemaNotFound(name.to_owned()).into());
        }
        if versions.iter().any(|v| v.is_builtin) {
          return Err(
            forma_core::Error::InvalidOperation(format!(
              "cannot delete built-in schema {name}"
            ))
            .into(),
          );
        }
        let generations = entity::count_generations(tx, name)?;
        let removed = entity::delete_versions(tx, name)?;
        Ok((removed, generations))
      })
      .await?;

    tracing::info!(schema = %name, versions, generations, "deleted schema");
    Ok(())
  }

  async fn ensure_builtins_seeded(&self, definitions: &[SchemaDefinition]) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for definition in definitions {
      let name = definition.name.clone();
      let definition = SchemaDefinition {
        is_builtin: true,
        ..definition.clone()
      };

      let outcome = self
        .write(move |tx| {
          if chain::resolve_current(tx, &definition.name)?.is_some() {
            return Ok(None);
          }
          chain::append_version(tx, &definition, Base::Observed(None)).map(Some)
        })
        .await;

      match outcome {
        Ok(Some(version)) => {
          tracing::info!(schema = %name, version_id = %version.id, "seeded built-in schema");
          report.inserted.push(name);
        }
        Ok(None) => {
          tracing::debug!(schema = %name, "built-in schema already present");
          report.skipped.push(name);
        }
        Err(e) => {
          tracing::error!(schema = %name, error = %e, "failed to seed built-in schema");
          report.failed.push((name, e.to_string()));
        }
      }
    }

    Ok(report)
  }

  // ── Generations ───────────────────────────────────────────────────────────

  async fn record(&self, input: NewGeneration) -> Result<Generation> {
    self
      .write(move |tx| {
        let version = entity::get_version(tx, input.version_id)?
          .ok_or(forma_core::Error::VersionNotFound(input.version_id))?;
        if version.name != input.schema_name {
          return Err(
            forma_core::Error::ConstraintViolation(format!(
              "version {} belongs to schema {:?}, not {:?}",
              version.id, version.name, input.schema_name
            ))
            .into(),
          );
        }

        let id = entity::insert_generation(tx, &NewGenerationRow {
          version_id: version.id,
          prompt:     &input.prompt,
          output:     &input.output,
          created_at: Utc::now(),
        })?;
        entity::get_generation(tx, id)?
          .ok_or_else(|| forma_core::Error::GenerationNotFound(id).into())
      })
      .await
  }

  async fn list_for_schema(&self, name: &str, favorites_only: bool) -> Result<Vec<Generation>> {
    let name = name.to_owned();
    self
      .read(move |tx| {
        entity::query_generations(tx, GenerationQuery::BySchema {
          name: &name,
          favorites_only,
        })
      })
      .await
  }

  async fn list_all_generations(&self) -> Result<BTreeMap<String, Vec<Generation>>> {
    let all = self
      .read(|tx| entity::query_generations(tx, GenerationQuery::All))
      .await?;

    let mut grouped: BTreeMap<String, Vec<Generation>> = BTreeMap::new();
    for generation in all {
      grouped
        .entry(generation.schema_name.clone())
        .or_default()
        .push(generation);
    }
    Ok(grouped)
  }

  async fn toggle_favorite(&self, id: GenerationId) -> Result<Generation> {
    self
      .write(move |tx| {
        let current = entity::get_generation(tx, id)?
          .ok_or(forma_core::Error::GenerationNotFound(id))?;
        entity::set_favorite(tx, id, !current.is_favorite)?;
        entity::get_generation(tx, id)?
          .ok_or_else(|| forma_core::Error::GenerationNotFound(id).into())
      })
      .await
  }

  async fn delete_generation(&self, id: GenerationId) -> Result<()> {
    self.write(move |tx| entity::delete_generation(tx, id)).await
  }
}
