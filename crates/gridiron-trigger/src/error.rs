//! Error types and axum `IntoResponse` implementation.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("configuration error: {0}")]
  Config(String),
  #[error("run failed: {0}")]
  Run(#[from] gridiron_etl::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
      // Failure details go to the log only.
      Error::Config(_) | Error::Run(_) => {
        tracing::error!(error = %self, "trigger failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
      }
    }
  }
}
