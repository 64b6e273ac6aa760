//! Tests for `SqliteStore` and the lifecycle protocol running on top of it,
//! against an in-memory database.

mod lifecycle;

use std::{
  sync::{
    Mutex,
    atomic::{AtomicU32, Ordering},
  },
  time::Duration,
};

use casework_core::{
  GenerationError,
  gateway::{GenerationGateway, GenerationRequest},
  store::UserProgressStore,
  user::User,
};
use rand_core::{RngCore, impls};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Gateways ────────────────────────────────────────────────────────────────

/// Returns the same text for every prompt and remembers the last request.
struct FixedGateway {
  text: String,
  last: Mutex<Option<GenerationRequest>>,
}

impl FixedGateway {
  fn new(text: &str) -> Self {
    Self { text: text.to_owned(), last: Mutex::new(None) }
  }

  fn last_request(&self) -> Option<GenerationRequest> { self.last.lock().unwrap().clone() }
}

impl GenerationGateway for FixedGateway {
  async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
    *self.last.lock().unwrap() = Some(request);
    Ok(self.text.clone())
  }
}

/// Always fails as an upstream error.
struct FailingGateway;

impl GenerationGateway for FailingGateway {
  async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
    Err(GenerationError::Upstream("HTTP 500: model overloaded".into()))
  }
}

/// Answers only after `delay`.
struct SlowGateway(Duration);

impl GenerationGateway for SlowGateway {
  async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
    tokio::time::sleep(self.0).await;
    Ok("late facts".into())
  }
}

// ─── User store with injected failures ───────────────────────────────────────

/// Delegates to a real store but fails the first `failures` calls to
/// `add_ongoing` and the first `promote_failures` calls to
/// `promote_to_completed`.
struct FlakyUsers {
  inner:            SqliteStore,
  failures:         AtomicU32,
  promote_failures: AtomicU32,
  calls:            AtomicU32,
}

fn take_failure(counter: &AtomicU32) -> bool {
  counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
}

impl FlakyUsers {
  fn new(inner: SqliteStore, failures: u32) -> Self {
    Self {
      inner,
      failures: AtomicU32::new(failures),
      promote_failures: AtomicU32::new(0),
      calls: AtomicU32::new(0),
    }
  }

  fn failing_promotes(inner: SqliteStore, promote_failures: u32) -> Self {
    Self { promote_failures: AtomicU32::new(promote_failures), ..Self::new(inner, 0) }
  }

  fn add_ongoing_calls(&self) -> u32 { self.calls.load(Ordering::SeqCst) }
}

impl UserProgressStore for FlakyUsers {
  type Error = Error;

  async fn ensure_user(&self, user_id: String) -> Result<User, Error> {
    self.inner.ensure_user(user_id).await
  }

  async fn get_user(&self, user_id: String) -> Result<Option<User>, Error> {
    self.inner.get_user(user_id).await
  }

  async fn add_ongoing(&self, user_id: String, case_id: Uuid) -> Result<(), Error> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if take_failure(&self.failures) {
      return Err(Error::Database(tokio_rusqlite::Error::ConnectionClosed));
    }
    self.inner.add_ongoing(user_id, case_id).await
  }

  async fn promote_to_completed(
    &self,
    user_id: String,
    case_id: Uuid,
    hours: u32,
  ) -> Result<bool, Error> {
    if take_failure(&self.promote_failures) {
      return Err(Error::Database(tokio_rusqlite::Error::ConnectionClosed));
    }
    self.inner.promote_to_completed(user_id, case_id, hours).await
  }
}

// ─── Randomness ──────────────────────────────────────────────────────────────

/// Replays a fixed sequence of values.
struct Sequence(Vec<u64>, usize);

impl RngCore for Sequence {
  fn next_u32(&mut self) -> u32 { self.next_u64() as u32 }

  fn next_u64(&mut self) -> u64 {
    let v = self.0[self.1 % self.0.len()];
    self.1 += 1;
    v
  }

  fn fill_bytes(&mut self, dest: &mut [u8]) { impls::fill_bytes_via_next(self, dest) }

  fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
    self.fill_bytes(dest);
    Ok(())
  }
}

/// Assert the set-partition invariant for a user.
fn assert_partitioned(user: &User) {
  for id in &user.ongoing_case_ids {
    assert!(!user.completed_case_ids.contains(id), "{id} in both sets");
    assert_eq!(user.ongoing_case_ids.iter().filter(|c| *c == id).count(), 1);
  }
  for id in &user.completed_case_ids {
    assert_eq!(user.completed_case_ids.iter().filter(|c| *c == id).count(), 1);
  }
}
