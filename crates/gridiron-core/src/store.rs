//! The `Warehouse` trait: everything the loader needs from the data
//! warehouse.
//!
//! Implemented by storage backends (e.g. `gridiron-store-sqlite`). The
//! orchestrator in `gridiron-etl` depends on this abstraction only.

use std::{collections::HashSet, future::Future};

use chrono::NaiveDate;

use crate::row::{KeyColumn, RowBatch, Table};

/// Abstraction over the warehouse holding the games and team-metrics tables.
///
/// All methods return `Send` futures so the trait can be used from the axum
/// trigger handler.
pub trait Warehouse: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Return the subset of `candidates` already present in `table` under
  /// `column`, in a single round-trip.
  ///
  /// With `partition: Some(date)` only rows whose `dataDate` equals `date`
  /// count, which makes the key effectively `(column, dataDate)`. With `None`
  /// the whole table is searched.
  fn existing_keys<'a>(
    &'a self,
    table: Table,
    column: KeyColumn,
    partition: Option<NaiveDate>,
    candidates: &'a [String],
  ) -> impl Future<Output = Result<HashSet<String>, Self::Error>> + Send + 'a;

  /// Number of rows in `table` whose `dataDate` equals `partition`.
  fn count_partition(
    &self,
    table: Table,
    partition: NaiveDate,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Insert every row of `batch` into `table` as one unit. Returns the number
  /// of rows written.
  ///
  /// Backends reject a batch whose shape does not match `table`.
  fn insert<'a>(
    &'a self,
    table: Table,
    batch: &'a RowBatch,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Delete rows of `table` with `dataDate` strictly before `cutoff`. Returns
  /// the number of rows removed.
  fn delete_before(
    &self,
    table: Table,
    cutoff: NaiveDate,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Whether `error` would recur if the same call were repeated. Writers
  /// stop retrying on such errors. Defaults to `false`.
  fn is_permanent(_error: &Self::Error) -> bool { false }
}
