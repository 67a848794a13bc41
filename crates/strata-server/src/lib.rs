//! Server wiring for Strata: configuration, store setup and the HTTP app.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::Router;
use serde::Deserialize;
use strata_core::Gateway;
use strata_store_sqlite::{SqliteStore, StoreOptions};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `STRATA_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub database_path:   PathBuf,
  pub busy_timeout_ms: u64,
  /// Token for the first credential. Generated when unset.
  pub bootstrap_token: Option<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:            "127.0.0.1".into(),
      port:            5000,
      database_path:   PathBuf::from("strata.db"),
      busy_timeout_ms: 5000,
      bootstrap_token: None,
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `STRATA_*` variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("STRATA"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions {
      busy_timeout: Duration::from_millis(self.busy_timeout_ms),
    }
  }

  /// Open the database named by this config.
  pub async fn open_store(&self) -> anyhow::Result<SqliteStore> {
    let path = expand_tilde(&self.database_path);
    SqliteStore::open_with(&path, self.store_options())
      .await
      .with_context(|| format!("failed to open store at {path:?}"))
  }
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

// ─── Application ──────────────────────────────────────────────────────────────

/// Ensure a first credential exists. A freshly generated token is logged once
/// since it cannot be recovered later.
pub async fn bootstrap(gateway: &Gateway<SqliteStore>, token: Option<String>) -> anyhow::Result<()> {
  let configured = token.is_some();
  let created = gateway
    .bootstrap(token)
    .await
    .context("failed to bootstrap credentials")?;

  match created {
    Some(cred) if !configured => {
      tracing::warn!(token = %cred.token, "generated bootstrap API key with read and write access");
    }
    Some(_) => tracing::info!("installed configured bootstrap API key"),
    None => tracing::debug!("credentials present, skipping bootstrap"),
  }
  Ok(())
}

/// The full HTTP app: the API under `/api/v1` with request tracing.
pub fn app(gateway: Gateway<SqliteStore>) -> Router {
  Router::new()
    .nest("/api/v1", strata_api::api_router(gateway))
    .layer(TraceLayer::new_for_http())
}

/// Open the store, bootstrap it and build the app.
pub async fn build(cfg: &ServerConfig) -> anyhow::Result<Router> {
  let store = cfg.open_store().await?;
  let gateway = Gateway::new(Arc::new(store));
  bootstrap(&gateway, cfg.bootstrap_token.clone()).await?;
  Ok(app(gateway))
}
