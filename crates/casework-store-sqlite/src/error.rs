//! Error type for `casework-store-sqlite`.

use casework_core::Error as CoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {column} value in store: {value:?}")]
  UnknownValue { column: &'static str, value: String },

  #[error("case not found: {0}")]
  CaseNotFound(Uuid),

  #[error("user not found: {0}")]
  UserNotFound(String),

  #[error("submission not found: {0}")]
  SubmissionNotFound(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for CoreError {
  fn from(e: Error) -> Self {
    match e {
      Error::CaseNotFound(id) => CoreError::CaseNotFound(id),
      Error::UserNotFound(id) => CoreError::UserNotFound(id),
      Error::SubmissionNotFound(id) => CoreError::SubmissionNotFound(id),
      other => CoreError::persistence(other),
    }
  }
}
