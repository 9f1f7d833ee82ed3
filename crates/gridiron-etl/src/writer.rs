//! Bulk insert with bounded exponential-backoff retry.

use std::time::Duration;

use gridiron_core::{
  row::{RowBatch, Table},
  store::Warehouse,
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{Error, Result, error::BoxError};

/// How many times to try a write and how long to wait between tries.
///
/// The wait before attempt `n + 1` is `base_delay * multiplier^(n - 1)`: with
/// the defaults, 2 s then 4 s.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
  #[serde(default = "default_attempts")]
  pub attempts:      u32,
  #[serde(default = "default_base_delay_ms")]
  pub base_delay_ms: u64,
  #[serde(default = "default_multiplier")]
  pub multiplier:    u32,
}

impl RetryPolicy {
  /// Delay after failed attempt number `attempt` (1-based).
  pub fn delay_after(&self, attempt: u32) -> Duration {
    let factor = u64::from(self.multiplier).saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      attempts:      default_attempts(),
      base_delay_ms: default_base_delay_ms(),
      multiplier:    default_multiplier(),
    }
  }
}

fn default_attempts() -> u32 { 3 }

fn default_base_delay_ms() -> u64 { 2_000 }

fn default_multiplier() -> u32 { 2 }

/// Result of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Written {
  pub rows:     usize,
  pub attempts: u32,
}

/// Insert `batch` into `table`, retrying failures per `policy`.
///
/// Each attempt is bounded by `attempt_timeout`; a timed-out attempt counts
/// as a failure. An empty batch is a no-op and never touches the warehouse.
/// When every attempt fails the last error is returned. An error the
/// warehouse reports as permanent is returned at once, without retrying.
pub async fn write_with_retry<W: Warehouse>(
  warehouse: &W,
  table: Table,
  batch: &RowBatch,
  policy: &RetryPolicy,
  attempt_timeout: Duration,
) -> Result<Written> {
  if batch.is_empty() {
    info!(%table, "no rows to insert");
    return Ok(Written { rows: 0, attempts: 0 });
  }

  let attempts = policy.attempts.max(1);
  let mut attempt = 1;
  loop {
    let (failure, permanent): (BoxError, bool) =
      match tokio::time::timeout(attempt_timeout, warehouse.insert(table, batch)).await {
        Ok(Ok(rows)) => {
          info!(%table, rows, attempt, "inserted rows");
          return Ok(Written { rows, attempts: attempt });
        }
        Ok(Err(e)) => {
          let permanent = W::is_permanent(&e);
          (Box::new(e), permanent)
        }
        Err(_) => {
          (Box::new(Error::Timeout { operation: "insert", after: attempt_timeout }), false)
        }
      };

    error!(%table, attempt, error = %failure, "insert failed");
    if permanent {
      error!(%table, attempt, "insert error is permanent, not retrying");
      return Err(Error::Write { table, attempts: attempt, source: failure });
    }
    if attempt >= attempts {
      error!(%table, attempts, "giving up on insert");
      return Err(Error::Write { table, attempts, source: failure });
    }

    let delay = policy.delay_after(attempt);
    attempt += 1;
    warn!(%table, delay_ms = delay.as_millis() as u64, "retrying insert (attempt {attempt}/{attempts})");
    tokio::time::sleep(delay).await;
  }
}
