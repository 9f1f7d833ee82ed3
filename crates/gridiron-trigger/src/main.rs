//! gridiron binary.
//!
//! Reads `gridiron.toml` (or the path given with `--config`) plus `GRIDIRON_*`
//! environment variables, opens the SQLite warehouse and either serves the
//! `POST /` trigger or, with `--once`, runs every job a single time and exits.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::Parser;
use gridiron_etl::{Pipeline, RapidApiFeed};
use gridiron_store_sqlite::SqliteWarehouse;
use gridiron_trigger::{AppState, LogFormat, TriggerConfig};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "NFL schedule and team-stats loader")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "gridiron.toml")]
  config: PathBuf,

  /// Run every job once and exit instead of serving the trigger.
  #[arg(long)]
  once: bool,

  /// Load date for `--once` (YYYY-MM-DD). Defaults to today.
  #[arg(long, requires = "once")]
  load_date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  // Configuration comes first: it picks the log format.
  let cfg = TriggerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  init_tracing(cfg.log_format);

  let feed_config = cfg.api.feed_config().context("invalid [api] settings")?;
  let feed = RapidApiFeed::new(feed_config).context("failed to build http client")?;

  let store_path = expand_tilde(&cfg.store_path);
  let warehouse = SqliteWarehouse::open(&store_path)
    .await
    .with_context(|| format!("failed to open warehouse at {store_path:?}"))?;

  let pipeline = Arc::new(Pipeline::new(Arc::new(warehouse), Arc::new(feed), cfg.pipeline.clone()));

  if cli.once {
    let report = pipeline.run(cli.load_date).await.context("run failed")?;
    println!("{report}");
    return Ok(());
  }

  let app = gridiron_trigger::router(AppState { pipeline });
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .from_env_lossy();

  match format {
    LogFormat::Console => tracing_subscriber::fmt().with_env_filter(filter).init(),
    LogFormat::Json => tracing_subscriber::fmt()
      .json()
      .with_current_span(true)
      .with_span_list(false)
      .with_env_filter(filter)
      .init(),
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
