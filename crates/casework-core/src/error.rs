//! Error types for `casework-core`.
//!
//! Every failure that reaches a request boundary is a [`Error`], and every
//! [`Error`] has a stable [`ErrorKind`] the transport layer maps to a status.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of the external text-generation service.
#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("generation timed out after {0:?}")]
  Timeout(Duration),

  #[error("upstream error: {0}")]
  Upstream(String),

  #[error("upstream returned no text")]
  EmptyResponse,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid request: {0}")]
  InvalidRequest(String),

  #[error("case not found: {0}")]
  CaseNotFound(Uuid),

  #[error("user not found: {0}")]
  UserNotFound(String),

  #[error("submission not found: {0}")]
  SubmissionNotFound(Uuid),

  #[error("user {user_id} does not own case {case_id}")]
  Forbidden { case_id: Uuid, user_id: String },

  #[error("generation failed: {0}")]
  GenerationFailed(#[from] GenerationError),

  #[error("persistence error: {0}")]
  Persistence(#[source] BoxError),

  /// The case was persisted but could not be linked into its owner's record.
  /// It stays in the registry and is reported by the unlinked-case scan.
  #[error("case {case_id} was created but not linked to user {owner_id}: {source}")]
  CaseUnlinked {
    case_id:  Uuid,
    owner_id: String,
    #[source]
    source:   Box<Error>,
  },

  #[error("consistency error on case {case_id} for user {user_id}: {detail}")]
  Consistency {
    case_id: Uuid,
    user_id: String,
    detail:  String,
  },
}

/// The stable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  InvalidRequest,
  NotFound,
  Forbidden,
  GenerationFailed,
  Persistence,
  Consistency,
}

impl ErrorKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::InvalidRequest => "invalid_request",
      Self::NotFound => "not_found",
      Self::Forbidden => "forbidden",
      Self::GenerationFailed => "generation_failed",
      Self::Persistence => "persistence_error",
      Self::Consistency => "consistency_error",
    }
  }

  /// Whether the caller may retry the same request.
  pub fn is_retryable(self) -> bool {
    matches!(self, Self::GenerationFailed | Self::Persistence)
  }
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
      Self::CaseNotFound(_)
      | Self::UserNotFound(_)
      | Self::SubmissionNotFound(_) => ErrorKind::NotFound,
      Self::Forbidden { .. } => ErrorKind::Forbidden,
      Self::GenerationFailed(_) => ErrorKind::GenerationFailed,
      Self::Persistence(_) | Self::CaseUnlinked { .. } => ErrorKind::Persistence,
      Self::Consistency { .. } => ErrorKind::Consistency,
    }
  }

  /// Wrap a storage backend failure.
  pub fn persistence(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Persistence(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Parse a required id field supplied by a caller.
///
/// Missing, empty, and malformed values are all [`Error::InvalidRequest`].
pub fn parse_id(field: &str, value: Option<&str>) -> Result<Uuid> {
  let raw = require(field, value)?;
  Uuid::parse_str(raw)
    .map_err(|_| Error::InvalidRequest(format!("{field} is not a valid id: {raw:?}")))
}

/// Require a non-empty string field supplied by a caller.
pub fn require<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str> {
  match value.map(str::trim) {
    Some(v) if !v.is_empty() => Ok(v),
    _ => Err(Error::InvalidRequest(format!("{field} is required"))),
  }
}
