//! HTTP trigger for the gridiron loader.
//!
//! Exposes an axum [`Router`] with a single `POST /` that runs every
//! configured job once, plus the configuration the `gridiron` binary reads.

pub mod error;

pub use error::Error;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::{
  Router,
  extract::{Query, State},
  routing::post,
};
use chrono::NaiveDate;
use config::{Config, ConfigBuilder, ConfigError, Environment, builder::DefaultState};
use gridiron_core::{feed::SportsFeed, schedule::API_DATE_FORMAT, store::Warehouse};
use gridiron_etl::{FeedConfig, Pipeline, PipelineSettings};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

const API_HOST: &str = "tank01-nfl-live-in-game-real-time-statistics-nfl.p.rapidapi.com";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
  #[default]
  Console,
  Json,
}

/// Runtime configuration, deserialised from `gridiron.toml` and `GRIDIRON_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct TriggerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub log_format: LogFormat,
  #[serde(default)]
  pub api:        ApiSettings,
  #[serde(default)]
  pub pipeline:   PipelineSettings,
}

impl TriggerConfig {
  /// Read `path` if it exists, then overlay the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::from_builder(Config::builder().add_source(config::File::from(path).required(false)))
  }

  /// Finish `builder` with the environment layer and deserialise. Nested keys
  /// use `__`, e.g. `GRIDIRON_API__API_KEY`.
  pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
    builder
      .add_source(Environment::with_prefix("GRIDIRON").prefix_separator("_").separator("__"))
      .build()?
      .try_deserialize()
  }
}

/// The sports-data API endpoint and credential.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
  #[serde(default = "default_base_url")]
  pub base_url:     String,
  #[serde(default = "default_host_header")]
  pub host_header:  String,
  #[serde(default)]
  pub api_key:      Option<String>,
  /// Read the key from this file when `api_key` is unset.
  #[serde(default)]
  pub api_key_file: Option<PathBuf>,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl ApiSettings {
  /// `api_key` if set, otherwise the trimmed contents of `api_key_file`.
  pub fn resolve_key(&self) -> Result<String, Error> {
    if let Some(key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
      return Ok(key.to_owned());
    }
    let Some(path) = &self.api_key_file else {
      return Err(Error::Config("set api.api_key or api.api_key_file".into()));
    };
    let key = std::fs::read_to_string(path)
      .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    let key = key.trim();
    if key.is_empty() {
      return Err(Error::Config(format!("{} is empty", path.display())));
    }
    Ok(key.to_owned())
  }

  pub fn feed_config(&self) -> Result<FeedConfig, Error> {
    Ok(FeedConfig {
      base_url:    self.base_url.clone(),
      host_header: self.host_header.clone(),
      api_key:     self.resolve_key()?,
      timeout:     Duration::from_secs(self.timeout_secs),
    })
  }
}

impl Default for ApiSettings {
  fn default() -> Self {
    Self {
      base_url:     default_base_url(),
      host_header:  default_host_header(),
      api_key:      None,
      api_key_file: None,
      timeout_secs: default_timeout_secs(),
    }
  }
}

fn default_host() -> String { "0.0.0.0".into() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("gridiron.db") }

fn default_base_url() -> String { format!("https://{API_HOST}") }

fn default_host_header() -> String { API_HOST.into() }

fn default_timeout_secs() -> u64 { 30 }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the trigger handler.
pub struct AppState<W, F> {
  pub pipeline: Arc<Pipeline<W, F>>,
}

impl<W, F> Clone for AppState<W, F> {
  fn clone(&self) -> Self { Self { pipeline: self.pipeline.clone() } }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the trigger [`Router`].
pub fn router<W, F>(state: AppState<W, F>) -> Router
where
  W: Warehouse + 'static,
  F: SportsFeed + 'static,
{
  Router::new()
    .route("/", post(trigger_handler::<W, F>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[derive(Debug, Deserialize)]
struct TriggerParams {
  load_date: Option<String>,
}

/// Run every job once. Responds 200 even when individual units failed; only
/// an error escaping the run is a 500.
async fn trigger_handler<W, F>(
  State(state): State<AppState<W, F>>,
  Query(params): Query<TriggerParams>,
) -> Result<String, Error>
where
  W: Warehouse + 'static,
  F: SportsFeed + 'static,
{
  let load_date = params.load_date.as_deref().map(parse_load_date).transpose()?;
  let report = state.pipeline.run(load_date).await?;
  Ok(format!("{report}\n"))
}

/// Accepts `YYYY-MM-DD` or the API's `YYYYMMDD`.
pub fn parse_load_date(raw: &str) -> Result<NaiveDate, Error> {
  let raw = raw.trim();
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .or_else(|_| NaiveDate::parse_from_str(raw, API_DATE_FORMAT))
    .map_err(|_| Error::BadRequest(format!("load_date {raw:?} is not a YYYY-MM-DD date")))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
