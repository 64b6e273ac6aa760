//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Enums are stored as their lowercase names.

use casework_core::{
  artifact::{Side, Submission},
  case::{Case, CaseKind, CaseStatus},
  user::User,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<CaseStatus> {
  match s {
    "ongoing" => Ok(CaseStatus::Ongoing),
    "completed" => Ok(CaseStatus::Completed),
    other => Err(Error::UnknownValue { column: "status", value: other.to_owned() }),
  }
}

pub fn decode_side(s: &str) -> Result<Side> {
  Side::parse(s).map_err(|_| Error::UnknownValue { column: "side", value: s.to_owned() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawCase::from_row`].
pub const CASE_COLUMNS: &str =
  "case_id, owner_id, kind, status, content, created_at, submitted_at";

/// Raw strings read directly from a `cases` row.
pub struct RawCase {
  pub case_id:      String,
  pub owner_id:     String,
  pub kind:         String,
  pub status:       String,
  pub content:      String,
  pub created_at:   String,
  pub submitted_at: Option<String>,
}

impl RawCase {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      case_id:      row.get(0)?,
      owner_id:     row.get(1)?,
      kind:         row.get(2)?,
      status:       row.get(3)?,
      content:      row.get(4)?,
      created_at:   row.get(5)?,
      submitted_at: row.get(6)?,
    })
  }

  pub fn into_case(self) -> Result<Case> {
    Ok(Case {
      case_id:      decode_uuid(&self.case_id)?,
      owner_id:     self.owner_id,
      // Unknown kinds stay readable; they credit no hours.
      kind:         CaseKind::parse(&self.kind),
      status:       decode_status(&self.status)?,
      content:      self.content,
      created_at:   decode_dt(&self.created_at)?,
      submitted_at: self.submitted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read from a `users` row plus its `user_cases` links, in
/// link order.
pub struct RawUser {
  pub user_id:     String,
  pub total_hours: i64,
  pub created_at:  String,
  /// `(case_id, bucket)` pairs.
  pub links:       Vec<(String, String)>,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    let mut ongoing_case_ids = Vec::new();
    let mut completed_case_ids = Vec::new();
    for (case_id, bucket) in self.links {
      let case_id = decode_uuid(&case_id)?;
      match bucket.as_str() {
        "ongoing" => ongoing_case_ids.push(case_id),
        "completed" => completed_case_ids.push(case_id),
        other => {
          return Err(Error::UnknownValue { column: "bucket", value: other.to_owned() });
        }
      }
    }

    let total_hours = u32::try_from(self.total_hours).map_err(|_| Error::UnknownValue {
      column: "total_hours",
      value:  self.total_hours.to_string(),
    })?;

    Ok(User {
      user_id: self.user_id,
      total_hours,
      ongoing_case_ids,
      completed_case_ids,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Column list matching [`RawSubmission::from_row`].
pub const SUBMISSION_COLUMNS: &str =
  "submission_id, case_id, user_id, side, argument, submitted_at";

/// Raw strings read directly from a `submissions` row.
pub struct RawSubmission {
  pub submission_id: String,
  pub case_id:       String,
  pub user_id:       String,
  pub side:          String,
  pub argument:      String,
  pub submitted_at:  String,
}

impl RawSubmission {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      submission_id: row.get(0)?,
      case_id:       row.get(1)?,
      user_id:       row.get(2)?,
      side:          row.get(3)?,
      argument:      row.get(4)?,
      submitted_at:  row.get(5)?,
    })
  }

  pub fn into_submission(self) -> Result<Submission> {
    Ok(Submission {
      submission_id: decode_uuid(&self.submission_id)?,
      case_id:       decode_uuid(&self.case_id)?,
      user_id:       self.user_id,
      side:          decode_side(&self.side)?,
      argument:      self.argument,
      submitted_at:  decode_dt(&self.submitted_at)?,
    })
  }
}
