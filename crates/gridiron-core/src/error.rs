//! Error types for `gridiron-core`.

use thiserror::Error;

use crate::row::KeyColumn;

#[derive(Debug, Error)]
pub enum Error {
  /// A candidate row has no value for the column being deduplicated on.
  #[error("row {index} has no value for key column {column}")]
  MissingKeyColumn { column: KeyColumn, index: usize },

  /// A record lacks a field every row derived from it needs (its natural id).
  #[error("required field missing: {0}")]
  MissingField(String),

  #[error("expected {expected} at {path}, found {found}")]
  TypeMismatch {
    path:     String,
    expected: &'static str,
    found:    &'static str,
  },

  /// The payload body is not the array of records the endpoint promises.
  #[error("unexpected payload shape: {0}")]
  UnexpectedShape(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
