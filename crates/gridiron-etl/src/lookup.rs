//! Existing-key lookups with a timeout and the configured failure policy.

use std::{collections::HashSet, future::Future, time::Duration};

use chrono::NaiveDate;
use gridiron_core::{
  row::{KeyColumn, Table},
  store::Warehouse,
};
use tracing::warn;

use crate::{
  Error, Result, context::RunContext, error::BoxError, settings::LookupFailurePolicy,
};

/// How a lookup is bounded and what a failed one means.
#[derive(Debug, Clone, Copy)]
pub struct LookupGuard {
  pub policy:  LookupFailurePolicy,
  pub timeout: Duration,
}

impl LookupGuard {
  /// Keys of `candidates` already in `table`. Under
  /// [`LookupFailurePolicy::AssumeEmpty`] a failed or timed-out lookup yields
  /// the empty set.
  pub async fn existing_keys<W: Warehouse>(
    &self,
    ctx: &mut RunContext,
    warehouse: &W,
    table: Table,
    column: KeyColumn,
    partition: Option<NaiveDate>,
    candidates: &[String],
  ) -> Result<HashSet<String>> {
    let lookup = warehouse.existing_keys(table, column, partition, candidates);
    self.run(ctx, table, "existing-key lookup", HashSet::new(), lookup).await
  }

  /// Whether any row of `table` already carries `partition` as its
  /// `dataDate`. Under [`LookupFailurePolicy::AssumeEmpty`] a failure yields
  /// `false`.
  pub async fn partition_exists<W: Warehouse>(
    &self,
    ctx: &mut RunContext,
    warehouse: &W,
    table: Table,
    partition: NaiveDate,
  ) -> Result<bool> {
    let count = warehouse.count_partition(table, partition);
    Ok(self.run(ctx, table, "partition lookup", 0, count).await? > 0)
  }

  async fn run<T, E>(
    &self,
    ctx: &mut RunContext,
    table: Table,
    operation: &'static str,
    fallback: T,
    lookup: impl Future<Output = Result<T, E>>,
  ) -> Result<T>
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let failure: BoxError = match tokio::time::timeout(self.timeout, lookup).await {
      Ok(Ok(found)) => return Ok(found),
      Ok(Err(e)) => Box::new(e),
      Err(_) => Box::new(Error::Timeout { operation, after: self.timeout }),
    };

    match self.policy {
      LookupFailurePolicy::AssumeEmpty => {
        ctx.counters.lookup_failures += 1;
        warn!(%table, error = %failure, "{operation} failed; assuming nothing is loaded yet");
        Ok(fallback)
      }
      LookupFailurePolicy::Fail => Err(Error::Lookup { table, source: failure }),
    }
  }
}
