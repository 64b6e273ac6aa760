//! Exercise artifacts: analyses, litigation submissions, and grades.
//!
//! All three are append-only. They reference cases (or submissions) by id and
//! never mutate any other record.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// The inclusive range a [`Grade::score`] must fall in.
pub const SCORE_RANGE: RangeInclusive<u8> = 0..=100;

// ─── Analysis ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
  pub analysis_id: Uuid,
  pub case_id:     Uuid,
  pub user_id:     String,
  pub content:     String,
  /// Server-assigned.
  pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAnalysis {
  pub case_id: Uuid,
  pub user_id: String,
  pub content: String,
}

// ─── Submission ──────────────────────────────────────────────────────────────

/// The party a litigation argument is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
  Plaintiff,
  Defendant,
}

impl Side {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Plaintiff => "plaintiff",
      Self::Defendant => "defendant",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "plaintiff" => Ok(Self::Plaintiff),
      "defendant" => Ok(Self::Defendant),
      other => Err(Error::InvalidRequest(format!(
        "side must be \"plaintiff\" or \"defendant\", got {other:?}"
      ))),
    }
  }
}

/// One litigation argument. A case may collect any number of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
  pub submission_id: Uuid,
  pub case_id:       Uuid,
  pub user_id:       String,
  pub side:          Side,
  pub argument:      String,
  /// Server-assigned.
  pub submitted_at:  DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
  pub case_id:  Uuid,
  pub user_id:  String,
  pub side:     Side,
  pub argument: String,
}

// ─── Grade ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
  pub grade_id:      Uuid,
  pub submission_id: Uuid,
  pub grader_id:     String,
  pub score:         u8,
  pub feedback:      String,
  /// Server-assigned.
  pub graded_at:     DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGrade {
  pub submission_id: Uuid,
  pub grader_id:     String,
  pub score:         u8,
  pub feedback:      String,
}

impl NewGrade {
  /// Reject scores outside [`SCORE_RANGE`].
  pub fn validate(&self) -> Result<()> {
    if SCORE_RANGE.contains(&self.score) {
      Ok(())
    } else {
      Err(Error::InvalidRequest(format!(
        "score must be between {} and {}, got {}",
        SCORE_RANGE.start(),
        SCORE_RANGE.end(),
        self.score
      )))
    }
  }
}
