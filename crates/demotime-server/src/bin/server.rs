//! DemoTime HTTP server.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, starts the outbound worker, and serves the JSON API. On Ctrl-C the
//! server stops accepting requests and waits for queued deliveries to finish.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(author, version, about = "DemoTime review workflow server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  demotime_server::init_tracing();
  let cli = Cli::parse();
  let config = demotime_server::load_config(&cli.config)?;

  let (engine, worker) = demotime_server::build_engine(&config).await?;
  let app = demotime_server::router(Arc::new(engine));
  let address = format!("{}:{}", config.host, config.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
    })
    .await
    .context("server error")?;

  let stats = worker.await.context("outbound worker panicked")?;
  tracing::info!(delivered = stats.delivered, failed = stats.failed, "shut down");
  Ok(())
}
