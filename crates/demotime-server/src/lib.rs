//! Process wiring shared by the DemoTime binaries.
//!
//! Both `server` and `send-reminders` read the same [`ServerConfig`], open the
//! same SQLite store, make sure the system user exists, and start an outbound
//! worker before building the [`Workflow`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::Router;
use demotime_core::{
  outbound::OutboundQueue,
  store::ReviewStore,
  user::{NewUser, User},
};
use demotime_outbound::{
  ChannelQueue,
  HttpWebhookTransport,
  LogMailer,
  RetryPolicy,
  WorkerStats,
};
use demotime_store_sqlite::SqliteStore;
use demotime_workflow::{EngineConfig, Workflow};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// The engine as the binaries run it.
pub type Engine = Workflow<SqliteStore, ChannelQueue>;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `config.toml` layered with
/// `DEMOTIME_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  /// SQLite file; `:memory:` keeps everything in process.
  pub store_path:            PathBuf,
  /// Base of the review links put in message bodies.
  pub server_url:            String,
  pub system_username:       String,
  pub system_email:          Option<String>,
  pub strict_delivery:       bool,
  pub default_reminder_days: u32,
  pub outbound:              OutboundConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                  "127.0.0.1".to_owned(),
      port:                  8000,
      store_path:            PathBuf::from("demotime.db"),
      server_url:            "http://localhost:8000".to_owned(),
      system_username:       "demotime".to_owned(),
      system_email:          None,
      strict_delivery:       false,
      default_reminder_days: demotime_core::settings::DEFAULT_REMINDER_DAYS,
      outbound:              OutboundConfig::default(),
    }
  }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutboundConfig {
  pub max_attempts:         u32,
  pub initial_backoff_ms:   u64,
  pub max_backoff_ms:       u64,
  pub webhook_timeout_secs: u64,
}

impl Default for OutboundConfig {
  fn default() -> Self {
    let policy = RetryPolicy::default();
    Self {
      max_attempts:         policy.max_attempts,
      initial_backoff_ms:   policy.initial_backoff.as_millis() as u64,
      max_backoff_ms:       policy.max_backoff.as_millis() as u64,
      webhook_timeout_secs: 10,
    }
  }
}

impl OutboundConfig {
  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      max_attempts:    self.max_attempts,
      initial_backoff: Duration::from_millis(self.initial_backoff_ms),
      max_backoff:     Duration::from_millis(self.max_backoff_ms),
    }
  }
}

/// Read `path` (optional) and the `DEMOTIME_*` environment. Nested keys use a
/// double underscore, e.g. `DEMOTIME_OUTBOUND__MAX_ATTEMPTS`.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("DEMOTIME")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

// ─── Bootstrap ────────────────────────────────────────────────────────────────

/// Initialise tracing; `RUST_LOG` overrides the `INFO` default.
pub fn init_tracing() {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();
}

pub async fn open_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
  if config.store_path.as_os_str() == ":memory:" {
    return SqliteStore::open_in_memory()
      .await
      .context("failed to open in-memory store");
  }
  let path = expand_tilde(&config.store_path);
  SqliteStore::open(&path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

/// Look the system user up by name, creating it on first start.
pub async fn system_user<S>(store: &S, config: &ServerConfig) -> anyhow::Result<User>
where
  S: ReviewStore,
{
  if let Some(user) = store
    .find_user(&config.system_username)
    .await
    .context("failed to look up the system user")?
  {
    return Ok(user);
  }
  let mut input = NewUser::new(config.system_username.clone());
  input.email = config.system_email.clone();
  let user = store
    .add_user(input)
    .await
    .context("failed to create the system user")?;
  tracing::info!(user_id = %user.user_id, username = %user.username, "created system user");
  Ok(user)
}

pub fn engine_config(config: &ServerConfig, system: &User) -> EngineConfig {
  let mut engine = EngineConfig::new(system.user_id);
  engine.server_url = config.server_url.clone();
  engine.strict_delivery = config.strict_delivery;
  engine.default_reminder_days = config.default_reminder_days;
  engine
}

/// Start the outbound worker. Must run inside a tokio runtime.
pub fn start_outbound(
  config: &OutboundConfig,
) -> anyhow::Result<(ChannelQueue, JoinHandle<WorkerStats>)> {
  let transport =
    HttpWebhookTransport::new(Duration::from_secs(config.webhook_timeout_secs))
      .context("failed to build the webhook client")?;
  Ok(demotime_outbound::spawn(LogMailer, transport, config.retry_policy()))
}

/// Everything [`Engine`] needs, in one call.
pub async fn build_engine(
  config: &ServerConfig,
) -> anyhow::Result<(Engine, JoinHandle<WorkerStats>)> {
  let store = open_store(config).await?;
  let system = system_user(&store, config).await?;
  let (queue, worker) = start_outbound(&config.outbound)?;
  let engine = Workflow::new(store, queue, engine_config(config, &system));
  Ok((engine, worker))
}

/// The API router with request tracing.
pub fn router<S, Q>(workflow: Arc<Workflow<S, Q>>) -> Router
where
  S: ReviewStore + 'static,
  Q: OutboundQueue + 'static,
{
  demotime_api::api_router(workflow).layer(TraceLayer::new_for_http())
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
