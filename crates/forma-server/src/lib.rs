//! Server wiring for forma: configuration and the HTTP cast adapter.
//!
//! The binary in `main.rs` loads a [`ServerConfig`], opens the SQLite
//! store, seeds the built-in schemas and serves [`forma_api::api_router`].

pub mod caster;

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub use caster::RemoteCaster;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, read from an optional TOML file and
/// `FORMA_*` environment variables (which take precedence).
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  /// A leading `~/` is expanded by the binary.
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  /// Endpoint that performs casts; receives `{text, target, instructions}`.
  pub cast_url:          String,
  #[serde(default = "default_cast_timeout_secs")]
  pub cast_timeout_secs: u64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8000 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/forma/forma.db") }

fn default_cast_timeout_secs() -> u64 { 60 }

impl ServerConfig {
  /// Layer `path` (if it exists) under the environment and deserialise.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("FORMA").try_parsing(true))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
  }

  #[test]
  fn full_file_is_read_verbatim() {
    let file = write_config(
      r#"
        host = "0.0.0.0"
        port = 9100
        store_path = "/var/lib/forma/forma.db"
        cast_url = "http://caster.internal/cast"
        cast_timeout_secs = 5
      "#,
    );

    let cfg = ServerConfig::load(file.path()).unwrap();
    assert_eq!(cfg, ServerConfig {
      host:              "0.0.0.0".into(),
      port:              9100,
      store_path:        PathBuf::from("/var/lib/forma/forma.db"),
      cast_url:          "http://caster.internal/cast".into(),
      cast_timeout_secs: 5,
    });
    assert_eq!(cfg.address(), "0.0.0.0:9100");
  }

  #[test]
  fn omitted_keys_fall_back_to_defaults() {
    let file = write_config(r#"cast_url = "http://localhost:9000/cast""#);

    let cfg = ServerConfig::load(file.path()).unwrap();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8000);
    assert_eq!(cfg.cast_timeout_secs, 60);
    assert!(cfg.store_path.starts_with("~"));
  }

  #[test]
  fn cast_url_is_required() {
    let file = write_config("port = 8001");
    let err = ServerConfig::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("cast_url"), "{err}");
  }

  #[test]
  fn tilde_expands_only_at_the_start() {
    let home = std::env::var("HOME").unwrap();
    assert_eq!(
      expand_tilde(Path::new("~/forma.db")),
      PathBuf::from(home).join("forma.db")
    );
    assert_eq!(expand_tilde(Path::new("/tmp/~/x")), PathBuf::from("/tmp/~/x"));
  }
}
