//! Storage traits for the three record owners.
//!
//! Each trait is implemented by a storage backend (e.g.
//! `casework-store-sqlite`). The backing store is assumed to offer
//! independent per-record writes and no cross-collection transaction, so every
//! mutating operation here is a single targeted, conditional write on one
//! record. Higher layers compose them under the protocol in
//! [`crate::lifecycle`].
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  artifact::{Analysis, Grade, NewAnalysis, NewGrade, NewSubmission, Submission},
  case::{Case, CaseStatus, NewCase},
  user::User,
};

/// Bounds shared by every backend error type.
///
/// The `Into<crate::Error>` conversion is where a backend classifies its own
/// failures: missing records become `NotFound` kinds, everything else becomes
/// [`crate::Error::Persistence`].
pub trait StoreError:
  std::error::Error + Into<crate::Error> + Send + Sync + 'static
{
}

impl<T> StoreError for T where
  T: std::error::Error + Into<crate::Error> + Send + Sync + 'static
{
}

// ─── Case registry ───────────────────────────────────────────────────────────

/// Owns [`Case`] records.
pub trait CaseRegistry: Send + Sync {
  type Error: StoreError;

  /// Persist a new case with a fresh id, status `ongoing`, and
  /// `created_at = now`. Touches no other record.
  fn create_case(
    &self,
    input: NewCase,
  ) -> impl Future<Output = Result<Case, Self::Error>> + Send + '_;

  /// Retrieve a case by id. Returns `None` if not found.
  fn get_case(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<Option<Case>, Self::Error>> + Send + '_;

  /// Conditionally complete a case.
  ///
  /// Only if the stored status equals `expected`, atomically set status to
  /// `completed` and `submitted_at = now` and return `true`. Otherwise return
  /// `false` without mutating anything. This compare-and-swap is the single
  /// serialization point for concurrent submissions of one case.
  fn mark_completed(
    &self,
    case_id: Uuid,
    expected: CaseStatus,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All cases owned by `owner_id`, newest first.
  fn list_cases_for_owner(
    &self,
    owner_id: String,
  ) -> impl Future<Output = Result<Vec<Case>, Self::Error>> + Send + '_;

  /// Every case its owner's record disagrees with: the id appears in neither
  /// of the owner's case sets, or the case is `completed` while the owner
  /// still holds it as ongoing (a completion whose hours were never
  /// credited).
  ///
  /// This is the detection half of reconciliation; it never mutates.
  fn list_unlinked_cases(
    &self,
  ) -> impl Future<Output = Result<Vec<Case>, Self::Error>> + Send + '_;
}

// ─── User progress ───────────────────────────────────────────────────────────

/// Owns [`User`] records, their case-id sets, and the hours counter.
///
/// Writes are targeted set-add / set-move / counter-increment primitives,
/// never whole-record replacement, so concurrent updates for different cases
/// of one user all apply.
pub trait UserProgressStore: Send + Sync {
  type Error: StoreError;

  /// Insert a zero-state user if absent; otherwise return the stored record
  /// unchanged. Never overwrites.
  fn ensure_user(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by id. Returns `None` if not found.
  fn get_user(
    &self,
    user_id: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Add `case_id` to the user's ongoing set. A no-op if the id is already
  /// linked in either set.
  fn add_ongoing(
    &self,
    user_id: String,
    case_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Move `case_id` from ongoing to completed and add `hours` to the total,
  /// as one atomic update.
  ///
  /// Returns `false` without mutating anything if `case_id` is not in the
  /// ongoing set.
  fn promote_to_completed(
    &self,
    user_id: String,
    case_id: Uuid,
    hours: u32,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Artifacts ───────────────────────────────────────────────────────────────

/// Owns the append-only [`Analysis`], [`Submission`] and [`Grade`] logs.
///
/// Every write validates that the referenced case (or submission) exists and
/// stamps a server-side timestamp.
pub trait ArtifactStore: Send + Sync {
  type Error: StoreError;

  fn record_analysis(
    &self,
    input: NewAnalysis,
  ) -> impl Future<Output = Result<Analysis, Self::Error>> + Send + '_;

  fn record_submission(
    &self,
    input: NewSubmission,
  ) -> impl Future<Output = Result<Submission, Self::Error>> + Send + '_;

  /// All submissions for a case. Order is unspecified; callers that need an
  /// order must sort by `submitted_at` themselves.
  fn list_submissions(
    &self,
    case_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Submission>, Self::Error>> + Send + '_;

  fn record_grade(
    &self,
    input: NewGrade,
  ) -> impl Future<Output = Result<Grade, Self::Error>> + Send + '_;
}
