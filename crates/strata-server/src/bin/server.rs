//! strata-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), layers
//! `STRATA_*` environment variables over it, opens the SQLite database and
//! serves the JSON API under `/api/v1`.
//!
//! # Minting a key offline
//!
//! ```
//! cargo run -p strata-server -- --issue-key read,write
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use strata_core::{access::PermissionSet, keys::KeyIssuer};
use strata_server::ServerConfig;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Strata JSON ingestion server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Mint an API key with the given permissions (e.g. `read,write`), print
  /// its token and exit.
  #[arg(long, value_name = "PERMS")]
  issue_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;

  // Helper mode: mint a key and exit.
  if let Some(perms) = cli.issue_key {
    let permissions: PermissionSet = perms.parse().context("invalid --issue-key value")?;
    let store = cfg.open_store().await?;
    let credential = KeyIssuer::new(&store)
      .issue(permissions)
      .await
      .context("failed to issue key")?;
    println!("{}", credential.token);
    return Ok(());
  }

  let app = strata_server::build(&cfg).await?;
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
