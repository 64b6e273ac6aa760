//! The lifecycle coordinator.
//!
//! Keeps a [`Case`] and its owner's [`User`](crate::user::User) record
//! consistent without a cross-record transaction. Every step is a single
//! conditional write on one record, ordered so that a failure at any point
//! leaves either nothing written or a state a retry (or the unlinked-case
//! scan) can move forward. Nothing already committed is ever rolled back.
//!
//! # Create
//!
//! 1. Draw a subject and call the gateway, bounded by a timeout. Failure here
//!    writes nothing.
//! 2. Persist the case.
//! 3. Ensure the owner exists and add the case to their ongoing set, retried
//!    with exponential backoff. If every attempt fails the case stays
//!    persisted but unlinked and [`Error::CaseUnlinked`] is returned.
//!
//! # Submit
//!
//! 1. Check ownership.
//! 2. Flip status `ongoing → completed` with a compare-and-swap. Losing the
//!    swap means the case was already completed: return the stored case and
//!    credit nothing.
//! 3. Move the case to the owner's completed set and credit the kind's hours
//!    in one conditional update. If the case is not in the ongoing set the
//!    status flip stands and [`Error::Consistency`] is returned. If the
//!    update keeps failing, the case stays completed but ongoing for its
//!    owner; a repeat submit does not credit it, and the unlinked-case scan
//!    reports it.

use std::{
  future::Future,
  sync::{Arc, Mutex, PoisonError},
  time::Duration,
};

use rand_core::{OsRng, RngCore};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  case::{Case, CaseKind, CaseStatus, NewCase},
  error::{GenerationError, require},
  gateway::GenerationGateway,
  store::{CaseRegistry, UserProgressStore},
  subject::CaseSubject,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Timing and retry policy for the coordinator.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
  /// Upper bound on a single gateway call.
  pub generation_timeout: Duration,
  /// Attempts for each post-commit write (linking a new case, crediting a
  /// completed one) before giving up.
  pub link_attempts:      u32,
  /// Delay before the second attempt; doubled for each one after.
  pub link_backoff:       Duration,
}

impl Default for LifecycleConfig {
  fn default() -> Self {
    Self {
      generation_timeout: Duration::from_secs(60),
      link_attempts:      3,
      link_backoff:       Duration::from_millis(100),
    }
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of a successful submit.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
  /// The case as stored after the call.
  pub case:            Case,
  /// Hours added to the owner's total by this call; zero on a repeat submit.
  pub hours_credited:  u32,
  /// `false` if the case had already been completed before this call.
  pub newly_completed: bool,
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

/// Orchestrates the multi-record case operations.
///
/// Generic over the case registry `C`, the user progress store `U`, the
/// generation gateway `G`, and the randomness source `R` used for subject
/// selection.
pub struct Coordinator<C, U, G, R = OsRng> {
  cases:   Arc<C>,
  users:   Arc<U>,
  gateway: Arc<G>,
  rng:     Mutex<R>,
  config:  LifecycleConfig,
}

impl<C, U, G> Coordinator<C, U, G, OsRng>
where
  C: CaseRegistry,
  U: UserProgressStore,
  G: GenerationGateway,
{
  pub fn new(cases: Arc<C>, users: Arc<U>, gateway: Arc<G>, config: LifecycleConfig) -> Self {
    Self { cases, users, gateway, rng: Mutex::new(OsRng), config }
  }
}

impl<C, U, G, R> Coordinator<C, U, G, R>
where
  C: CaseRegistry,
  U: UserProgressStore,
  G: GenerationGateway,
  R: RngCore + Send,
{
  /// Replace the randomness source used for subject selection.
  pub fn with_rng<N: RngCore + Send>(self, rng: N) -> Coordinator<C, U, G, N> {
    Coordinator {
      cases:   self.cases,
      users:   self.users,
      gateway: self.gateway,
      rng:     Mutex::new(rng),
      config:  self.config,
    }
  }

  pub fn config(&self) -> &LifecycleConfig { &self.config }

  /// Generate a case of `kind` for `owner_id` and link it as ongoing.
  pub async fn create_case(&self, owner_id: &str, kind: CaseKind) -> Result<Case> {
    let owner_id = require("owner_id", Some(owner_id))?;

    let subject = {
      let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
      CaseSubject::draw(&mut *rng)
    };

    let content = self.generate(&subject, kind).await?;

    let case = self
      .cases
      .create_case(NewCase { owner_id: owner_id.to_owned(), kind, content })
      .await
      .map_err(store_err)?;

    let case_id = case.case_id;
    let users = &*self.users;
    let linked = self
      .retry("link case to owner", case_id, move || async move {
        users.ensure_user(owner_id.to_owned()).await.map_err(store_err)?;
        users.add_ongoing(owner_id.to_owned(), case_id).await.map_err(store_err)
      })
      .await;

    if let Err(source) = linked {
      error!(
        %case_id, owner_id, error = %source,
        "case persisted but not linked to its owner"
      );
      return Err(Error::CaseUnlinked {
        case_id,
        owner_id: owner_id.to_owned(),
        source: Box::new(source),
      });
    }

    info!(%case_id, owner_id, %kind, tags = ?subject.tags, issues = ?subject.issues, "case created");
    Ok(case)
  }

  /// Complete `case_id` on behalf of `user_id`, crediting hours at most once.
  pub async fn submit_case(&self, case_id: Uuid, user_id: &str) -> Result<SubmitOutcome> {
    let user_id = require("user_id", Some(user_id))?;

    let case = self.fetch_case(case_id).await?;
    if case.owner_id != user_id {
      return Err(Error::Forbidden { case_id, user_id: user_id.to_owned() });
    }

    let flipped = self
      .cases
      .mark_completed(case_id, CaseStatus::Ongoing)
      .await
      .map_err(store_err)?;

    if !flipped {
      let current = self.fetch_case(case_id).await?;
      warn!(%case_id, user_id, status = %current.status, "repeat submit; nothing credited");
      return Ok(SubmitOutcome { case: current, hours_credited: 0, newly_completed: false });
    }

    let hours = case.kind.hours();
    let users = &*self.users;
    let promoted = self
      .retry("credit completed case", case_id, move || async move {
        users
          .promote_to_completed(user_id.to_owned(), case_id, hours)
          .await
          .map_err(store_err)
      })
      .await
      .inspect_err(|e| {
        error!(
          %case_id, user_id, hours, error = %e,
          "case completed but hours not credited; reported by the unlinked-case scan"
        );
      })?;

    if !promoted {
      let detail = "case was not in the owner's ongoing set".to_owned();
      error!(%case_id, user_id, hours, %detail, "case completed but owner record not updated");
      return Err(Error::Consistency { case_id, user_id: user_id.to_owned(), detail });
    }

    let current = self.fetch_case(case_id).await?;
    info!(%case_id, user_id, kind = %case.kind, hours, "case completed");
    Ok(SubmitOutcome { case: current, hours_credited: hours, newly_completed: true })
  }

  /// Cases their owner's record disagrees with: linked into neither set, or
  /// completed but still ongoing for the owner.
  pub async fn unlinked_cases(&self) -> Result<Vec<Case>> {
    self.cases.list_unlinked_cases().await.map_err(store_err)
  }

  async fn fetch_case(&self, case_id: Uuid) -> Result<Case> {
    self
      .cases
      .get_case(case_id)
      .await
      .map_err(store_err)?
      .ok_or(Error::CaseNotFound(case_id))
  }

  async fn generate(&self, subject: &CaseSubject, kind: CaseKind) -> Result<String> {
    let timeout = self.config.generation_timeout;
    let text = tokio::time::timeout(timeout, self.gateway.generate(subject.prompt(kind)))
      .await
      .map_err(|_| GenerationError::Timeout(timeout))??;

    if text.trim().is_empty() {
      return Err(GenerationError::EmptyResponse.into());
    }
    Ok(text)
  }

  /// Run `op` up to `link_attempts` times with exponential backoff.
  async fn retry<T, F, Fut>(&self, what: &'static str, case_id: Uuid, mut op: F) -> Result<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let attempts = self.config.link_attempts.max(1);
    let mut delay = self.config.link_backoff;
    let mut attempt = 1;

    loop {
      match op().await {
        Err(e) if attempt < attempts => {
          warn!(%case_id, attempt, error = %e, "{what} failed; retrying in {delay:?}");
          tokio::time::sleep(delay).await;
          delay *= 2;
          attempt += 1;
        }
        result => return result,
      }
    }
  }
}

fn store_err(e: impl Into<Error>) -> Error { e.into() }
