//! Fire every reminder that is due now, then exit once the resulting emails
//! have been handed off. Meant to be run periodically (cron, systemd timer).

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

#[derive(Parser)]
#[command(author, version, about = "Send due DemoTime reminders")]
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
  let sent = engine
    .fire_due_reminders()
    .await
    .context("failed to fire reminders")?;
  tracing::info!(sent, "reminders fired");

  // Dropping the engine closes the queue; the worker drains and stops.
  drop(engine);
  let stats = worker.await.context("outbound worker panicked")?;
  tracing::info!(delivered = stats.delivered, failed = stats.failed, "done");
  Ok(())
}
