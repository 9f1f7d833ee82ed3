//! [`RapidApiFeed`]: the sports-data API over HTTPS.

use std::time::Duration;

use gridiron_core::feed::{FeedRequest, FetchError, SportsFeed, extract_body};
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

/// Connection details for the sports-data API.
#[derive(Debug, Clone)]
pub struct FeedConfig {
  pub base_url:    String,
  /// Sent as `x-rapidapi-host`.
  pub host_header: String,
  /// Sent as `x-rapidapi-key`.
  pub api_key:     String,
  /// Whole-request timeout, connect included.
  pub timeout:     Duration,
}

pub struct RapidApiFeed {
  client: reqwest::Client,
  config: FeedConfig,
}

impl RapidApiFeed {
  pub fn new(config: FeedConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(config.timeout)
      .user_agent(concat!("gridiron/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(Error::Client)?;
    Ok(Self { client, config })
  }

  fn url(&self, request: &FeedRequest) -> String {
    format!("{}/{}", self.config.base_url.trim_end_matches('/'), request.endpoint)
  }
}

impl SportsFeed for RapidApiFeed {
  async fn fetch(&self, request: &FeedRequest) -> Result<Option<Value>, FetchError> {
    let url = self.url(request);
    debug!(%url, query = ?request.query, "fetching");

    let response = self
      .client
      .get(&url)
      .header("x-rapidapi-key", &self.config.api_key)
      .header("x-rapidapi-host", &self.config.host_header)
      .query(&request.query)
      .send()
      .await
      .map_err(|e| FetchError::Transport(Box::new(e)))?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Status(status.as_u16()));
    }

    let bytes = response.bytes().await.map_err(|e| FetchError::Transport(Box::new(e)))?;
    let payload: Value = serde_json::from_slice(&bytes)?;
    extract_body(payload)
  }
}
