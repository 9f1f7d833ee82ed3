//! Error type for `gridiron-store-sqlite`.

use gridiron_core::row::{KeyColumn, Table};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("cannot decode column value: {0}")]
  Decode(String),

  #[error("the {table} table has no {column} key column")]
  UnknownColumn { table: Table, column: KeyColumn },

  /// A batch of one row shape was sent to the other table.
  #[error("cannot insert {rows} into the {table} table")]
  ShapeMismatch { table: Table, rows: &'static str },
}

impl Error {
  /// True when repeating the same call cannot succeed: a wrong batch shape,
  /// an unknown column or a constraint violation.
  pub fn is_permanent(&self) -> bool {
    match self {
      Error::ShapeMismatch { .. } | Error::UnknownColumn { .. } => true,
      Error::Database(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))) => {
        e.code == rusqlite::ErrorCode::ConstraintViolation
      }
      _ => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
