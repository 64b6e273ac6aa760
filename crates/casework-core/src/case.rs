//! Case: a generated fact pattern a user works through.
//!
//! A case is created `ongoing` and moves to `completed` exactly once. The
//! content is opaque text once set; only `status` and `submitted_at` ever
//! change after creation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The exercise type attached to a case. Determines the hours credited when
/// the case completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseKind {
  #[default]
  New,
  Litigate,
  Judge,
  Grade,
  /// A kind string this build does not know about. Credits no hours.
  #[serde(other)]
  Unrecognized,
}

impl CaseKind {
  /// Progress hours credited the first time a case of this kind completes.
  pub fn hours(self) -> u32 {
    match self {
      Self::New => 50,
      Self::Litigate => 75,
      Self::Judge => 50,
      Self::Grade => 25,
      Self::Unrecognized => 0,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::New => "new",
      Self::Litigate => "litigate",
      Self::Judge => "judge",
      Self::Grade => "grade",
      Self::Unrecognized => "unrecognized",
    }
  }

  /// Parse a stored kind string. Unknown strings map to
  /// [`CaseKind::Unrecognized`] rather than failing, so old or foreign records
  /// stay readable.
  pub fn parse(s: &str) -> Self {
    match s {
      "new" => Self::New,
      "litigate" => Self::Litigate,
      "judge" => Self::Judge,
      "grade" => Self::Grade,
      _ => Self::Unrecognized,
    }
  }
}

impl fmt::Display for CaseKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of a case. Transitions only `Ongoing → Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
  Ongoing,
  Completed,
}

impl CaseStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Ongoing => "ongoing",
      Self::Completed => "completed",
    }
  }

  pub fn is_terminal(self) -> bool { matches!(self, Self::Completed) }
}

impl fmt::Display for CaseStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Case ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
  pub case_id:      Uuid,
  /// Identity-provider user id of the owner. Never embedded, only referenced.
  pub owner_id:     String,
  pub kind:         CaseKind,
  pub status:       CaseStatus,
  pub content:      String,
  /// Server-assigned; never changes after creation.
  pub created_at:   DateTime<Utc>,
  /// Set exactly once, by the `ongoing → completed` transition.
  pub submitted_at: Option<DateTime<Utc>>,
}

/// Input to [`crate::store::CaseRegistry::create_case`]. The id, status and
/// timestamps are always assigned by the registry.
#[derive(Debug, Clone)]
pub struct NewCase {
  pub owner_id: String,
  pub kind:     CaseKind,
  pub content:  String,
}
