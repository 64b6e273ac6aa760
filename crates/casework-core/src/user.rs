//! User progress record.
//!
//! Created lazily on first access. A case id lives in exactly one of
//! `ongoing_case_ids` / `completed_case_ids`, and `total_hours` only grows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:            String,
  pub total_hours:        u32,
  pub ongoing_case_ids:   Vec<Uuid>,
  pub completed_case_ids: Vec<Uuid>,
  pub created_at:         DateTime<Utc>,
}

impl User {
  pub fn is_ongoing(&self, case_id: Uuid) -> bool {
    self.ongoing_case_ids.contains(&case_id)
  }

  pub fn is_completed(&self, case_id: Uuid) -> bool {
    self.completed_case_ids.contains(&case_id)
  }

  /// Whether the case is linked into either set.
  pub fn is_linked(&self, case_id: Uuid) -> bool {
    self.is_ongoing(case_id) || self.is_completed(case_id)
  }
}
