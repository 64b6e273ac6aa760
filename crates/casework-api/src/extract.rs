//! Request extractors that reject with [`ApiError`].

use axum::extract::{FromRequest, rejection::JsonRejection};
use casework_core::Error;

use crate::error::ApiError;

/// [`axum::Json`] whose malformed, mistyped, or mislabelled bodies are
/// reported as `invalid_request`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::from(Error::InvalidRequest(rejection.body_text()))
  }
}
