//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use casework_core::{Error, ErrorKind, GenerationError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
///
/// Every core failure keeps its [`ErrorKind`]; the kind alone picks the
/// status code.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] Error);

impl ApiError {
  /// Classify a storage backend failure.
  pub fn store(e: impl Into<Error>) -> Self { Self(e.into()) }

  pub fn kind(&self) -> ErrorKind { self.0.kind() }

  fn status(&self) -> StatusCode {
    match self.kind() {
      ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
      ErrorKind::Forbidden => StatusCode::FORBIDDEN,
      ErrorKind::GenerationFailed => match &self.0 {
        Error::GenerationFailed(GenerationError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
      },
      ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
      ErrorKind::Consistency => StatusCode::CONFLICT,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let kind = self.kind();
    if status.is_server_error() {
      error!(kind = kind.as_str(), error = %self.0, "request failed");
    }

    let mut body = json!({
      "error": self.0.to_string(),
      "kind": kind.as_str(),
      "retryable": kind.is_retryable(),
    });
    // Partially applied operations name the record left behind.
    match &self.0 {
      Error::CaseUnlinked { case_id, .. } | Error::Consistency { case_id, .. } => {
        body["case_id"] = json!(case_id);
      }
      _ => {}
    }
    (status, Json(body)).into_response()
  }
}
