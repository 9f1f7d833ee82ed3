//! Dedup filter: drop candidate rows whose key is already persisted.

use std::collections::{BTreeSet, HashSet};

use crate::{
  Error, Result,
  row::{KeyColumn, Keyed},
};

/// Distinct key values of `rows` on `column`, in first-seen order.
///
/// Fails on the first row without a value for `column`.
pub fn candidate_keys<R: Keyed>(rows: &[R], column: KeyColumn) -> Result<Vec<String>> {
  let mut seen = BTreeSet::new();
  let mut keys = Vec::new();
  for (index, row) in rows.iter().enumerate() {
    let key = row.key(column).ok_or(Error::MissingKeyColumn { column, index })?;
    if seen.insert(key) {
      keys.push(key.to_owned());
    }
  }
  Ok(keys)
}

/// Keep only rows whose `column` value is absent from `existing`, preserving
/// input order.
///
/// A row with no value for `column` is an error, never silently admitted.
pub fn retain_new<R: Keyed>(
  existing: &HashSet<String>,
  rows: Vec<R>,
  column: KeyColumn,
) -> Result<Vec<R>> {
  let mut kept = Vec::with_capacity(rows.len());
  for (index, row) in rows.into_iter().enumerate() {
    let key = row.key(column).ok_or(Error::MissingKeyColumn { column, index })?;
    if !existing.contains(key) {
      kept.push(row);
    }
  }
  Ok(kept)
}
