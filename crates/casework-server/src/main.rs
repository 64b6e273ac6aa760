//! casework-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered under
//! `CASEWORK_*` environment variables, opens an in-process SQLite store, and
//! serves the JSON API over HTTP.
//!
//! # Unlinked cases
//!
//! A case whose owner link never landed stays in the store. To list them:
//!
//! ```
//! cargo run -p casework-server -- --report-unlinked
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use casework_core::Coordinator;
use casework_gateway::OpenAiGateway;
use casework_server::ServerConfig;
use casework_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Casework lifecycle server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print every case missing from its owner's case sets and exit.
  #[arg(long)]
  report_unlinked: bool,
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

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create store directory {parent:?}"))?;
  }
  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );

  if server_cfg.gateway.api_key.is_empty() {
    warn!("gateway.api_key is not set; case generation requests will be rejected upstream");
  }
  let gateway = Arc::new(
    OpenAiGateway::new(server_cfg.gateway.clone()).context("failed to build generation gateway")?,
  );
  let coordinator = Arc::new(Coordinator::new(
    store.clone(),
    store.clone(),
    gateway,
    server_cfg.lifecycle_config(),
  ));

  if cli.report_unlinked {
    let cases = coordinator
      .unlinked_cases()
      .await
      .context("failed to scan for unlinked cases")?;
    for case in &cases {
      println!("{}\t{}\t{}\t{}", case.case_id, case.owner_id, case.kind, case.status);
    }
    info!(count = cases.len(), "unlinked case scan complete");
    drop(coordinator);
    return close(store).await;
  }

  let app = casework_server::app(store.clone(), coordinator);
  let address = server_cfg.address();

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  close(store).await
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!("shutting down");
}

/// Close the store once every other handle to it is gone.
async fn close(store: Arc<SqliteStore>) -> anyhow::Result<()> {
  match Arc::try_unwrap(store) {
    Ok(store) => store.close().await.context("failed to close store"),
    Err(_) => {
      warn!("store still in use at shutdown; leaving it to drop");
      Ok(())
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
