//! The `SportsFeed` trait and payload validation.
//!
//! The feed is the sports-data API. Transport lives in `gridiron-etl`; this
//! module fixes the request shapes and what counts as a usable response.

use std::{fmt, future::Future};

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

use crate::{Error, Result, schedule::API_DATE_FORMAT};

// ─── Requests ────────────────────────────────────────────────────────────────

/// One call to the sports-data API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
  /// Path below the API base URL, e.g. `getNFLTeams`.
  pub endpoint: &'static str,
  pub query:    Vec<(&'static str, String)>,
}

impl FeedRequest {
  /// The day's games: `getNFLGamesForDate?gameDate=YYYYMMDD`.
  pub fn games_for_date(date: NaiveDate) -> Self {
    Self {
      endpoint: "getNFLGamesForDate",
      query:    vec![("gameDate", date.format(API_DATE_FORMAT).to_string())],
    }
  }

  /// All teams with stats and top performers, no rosters or schedules.
  pub fn teams() -> Self {
    Self {
      endpoint: "getNFLTeams",
      query:    vec![
        ("sortBy", "teamID".to_owned()),
        ("rosters", "false".to_owned()),
        ("schedules", "false".to_owned()),
        ("topPerformers", "true".to_owned()),
        ("teamStats", "true".to_owned()),
      ],
    }
  }
}

impl fmt::Display for FeedRequest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.endpoint)?;
    for (i, (k, v)) in self.query.iter().enumerate() {
      write!(f, "{}{k}={v}", if i == 0 { '?' } else { '&' })?;
    }
    Ok(())
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Why a fetch produced no payload.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("non-success status {0}")]
  Status(u16),

  #[error("transport error: {0}")]
  Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("response is not valid JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("response JSON is not an object")]
  NotAnObject,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the sports-data API.
pub trait SportsFeed: Send + Sync {
  /// Perform `request` and return the payload's `body`, or `None` when the
  /// body is absent or empty.
  fn fetch<'a>(
    &'a self,
    request: &'a FeedRequest,
  ) -> impl Future<Output = Result<Option<Value>, FetchError>> + Send + 'a;
}

// ─── Validation ──────────────────────────────────────────────────────────────

/// Pull the `body` out of a decoded response.
///
/// The response must be an object. A missing, null or empty `body` yields
/// `None`.
pub fn extract_body(response: Value) -> Result<Option<Value>, FetchError> {
  let Value::Object(mut map) = response else {
    return Err(FetchError::NotAnObject);
  };
  let body = map.remove("body").filter(|b| !is_empty(b));
  Ok(body)
}

fn is_empty(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::String(s) => s.is_empty(),
    Value::Array(a) => a.is_empty(),
    Value::Object(m) => m.is_empty(),
    _ => false,
  }
}

/// Check that a body is a list of records and return it.
pub fn records(body: &Value) -> Result<&[Value]> {
  match body {
    Value::Array(items) => Ok(items),
    other => Err(Error::UnexpectedShape(format!(
      "body should be an array of records, found {}",
      crate::json::type_name(other)
    ))),
  }
}
