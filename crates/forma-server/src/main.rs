//! forma server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) and `FORMA_*`
//! environment variables, opens the SQLite store, seeds the built-in schemas
//! and serves the JSON API over HTTP.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use forma_core::{builtin, store::SchemaStore};
use forma_server::{RemoteCaster, ServerConfig, expand_tilde};
use forma_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "forma schema server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create store directory {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Per-schema failures are logged and reported, not returned.
  let report = store
    .ensure_builtins_seeded(&builtin::definitions())
    .await
    .context("failed to seed built-in schemas")?;
  tracing::info!(
    inserted = report.inserted.len(),
    skipped = report.skipped.len(),
    failed = report.failed.len(),
    "built-in schemas checked"
  );

  let caster = RemoteCaster::new(
    server_cfg.cast_url.clone(),
    Duration::from_secs(server_cfg.cast_timeout_secs),
  )
  .context("failed to build cast client")?;

  let app = forma_api::api_router(Arc::new(store), Arc::new(caster));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
