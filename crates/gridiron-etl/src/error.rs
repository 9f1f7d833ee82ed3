//! Error types for `gridiron-etl`.

use std::time::Duration;

use gridiron_core::{feed::FetchError, row::Table};
use thiserror::Error;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("fetch failed: {0}")]
  Fetch(#[from] FetchError),

  #[error("invalid payload: {0}")]
  Validation(#[from] gridiron_core::Error),

  #[error("existing-key lookup on {table} failed: {source}")]
  Lookup { table: Table, source: BoxError },

  #[error("writing to {table} failed after {attempts} attempt(s): {source}")]
  Write { table: Table, attempts: u32, source: BoxError },

  #[error("{operation} timed out after {after:?}")]
  Timeout { operation: &'static str, after: Duration },

  #[error("stale-row cleanup on {table} failed: {source}")]
  Cleanup { table: Table, source: BoxError },

  #[error("invalid pipeline settings: {0}")]
  Settings(String),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("http client error: {0}")]
  Client(#[source] reqwest::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
