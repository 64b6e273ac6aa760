use std::{sync::Arc, time::Duration};

use casework_core::{
  Coordinator, Error as CoreError, ErrorKind, GenerationError, LifecycleConfig,
  case::{CaseKind, CaseStatus, NewCase},
  gateway::GenerationGateway,
  store::{CaseRegistry, UserProgressStore},
};
use uuid::Uuid;

use super::{
  FailingGateway, FixedGateway, FlakyUsers, Sequence, SlowGateway, assert_partitioned, store,
};
use crate::SqliteStore;

const FACTS: &str = "RoboCorp's warehouse AI reassigned shifts without notice.";

fn quick_config() -> LifecycleConfig {
  LifecycleConfig {
    generation_timeout: Duration::from_millis(200),
    link_attempts:      3,
    link_backoff:       Duration::from_millis(1),
  }
}

fn coordinator<G: GenerationGateway>(
  s: &SqliteStore,
  gateway: G,
) -> Coordinator<SqliteStore, SqliteStore, G> {
  let s = Arc::new(s.clone());
  Coordinator::new(s.clone(), s, Arc::new(gateway), quick_config())
}

async fn owned_case(
  c: &Coordinator<SqliteStore, SqliteStore, FixedGateway>,
  owner: &str,
  kind: CaseKind,
) -> Uuid {
  c.create_case(owner, kind).await.unwrap().case_id
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn created_case_is_visible_as_ongoing() {
  let s = store().await;
  let c = coordinator(&s, FixedGateway::new(FACTS));

  let case = c.create_case("user_1", CaseKind::New).await.unwrap();
  assert_eq!(case.status, CaseStatus::Ongoing);
  assert_eq!(case.owner_id, "user_1");
  assert_eq!(case.content, FACTS);

  let user = s.get_user("user_1".into()).await.unwrap().unwrap();
  assert_eq!(user.ongoing_case_ids, vec![case.case_id]);
  assert_eq!(user.total_hours, 0);
  assert_eq!(s.get_case(case.case_id).await.unwrap().unwrap(), case);
}

#[tokio::test]
async fn create_requires_owner() {
  let s = store().await;
  let c = coordinator(&s, FixedGateway::new(FACTS));

  let err = c.create_case("  ", CaseKind::New).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidRequest);
  assert!(s.list_unlinked_cases().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_prompts_with_the_drawn_subject() {
  let s = store().await;
  let gateway = Arc::new(FixedGateway::new(FACTS));
  let store = Arc::new(s.clone());
  // Tags index 2 ("Robotics"), one issue, issue index 10 ("Cybersecurity").
  let c = Coordinator::new(store.clone(), store, gateway.clone(), quick_config())
    .with_rng(Sequence(vec![2, 0, 10], 0));

  c.create_case("user_1", CaseKind::Judge).await.unwrap();

  let request = gateway.last_request().expect("gateway called");
  assert!(request.user_prompt.contains("involving Robotics"));
  assert!(request.user_prompt.contains("The legal issues are Cybersecurity."));
  assert!(request.user_prompt.contains("decide this case"));
}

#[tokio::test]
async fn gateway_failure_writes_nothing() {
  let s = store().await;
  let c = coordinator(&s, FailingGateway);

  let err = c.create_case("user_1", CaseKind::New).await.unwrap_err();
  assert!(matches!(err, CoreError::GenerationFailed(GenerationError::Upstream(_))));

  assert!(s.list_cases_for_owner("user_1".into()).await.unwrap().is_empty());
  assert!(s.get_user("user_1".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn gateway_timeout_is_a_generation_failure() {
  let s = store().await;
  let c = coordinator(&s, SlowGateway(Duration::from_secs(5)));

  let err = c.create_case("user_1", CaseKind::New).await.unwrap_err();
  assert!(matches!(err, CoreError::GenerationFailed(GenerationError::Timeout(_))));
  assert!(err.kind().is_retryable());
  assert!(s.list_cases_for_owner("user_1".into()).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_generation_is_rejected() {
  let s = store().await;
  let c = coordinator(&s, FixedGateway::new("   \n"));

  let err = c.create_case("user_1", CaseKind::New).await.unwrap_err();
  assert!(matches!(err, CoreError::GenerationFailed(GenerationError::EmptyResponse)));
  assert!(s.list_cases_for_owner("user_1".into()).await.unwrap().is_empty());
}

#[tokio::test]
async fn transient_link_failure_is_retried() {
  let s = store().await;
  let users = Arc::new(FlakyUsers::new(s.clone(), 2));
  let c = Coordinator::new(
    Arc::new(s.clone()),
    users.clone(),
    Arc::new(FixedGateway::new(FACTS)),
    quick_config(),
  );

  let case = c.create_case("user_1", CaseKind::New).await.unwrap();

  assert_eq!(users.add_ongoing_calls(), 3);
  let user = s.get_user("user_1".into()).await.unwrap().unwrap();
  assert_eq!(user.ongoing_case_ids, vec![case.case_id]);
  assert!(c.unlinked_cases().await.unwrap().is_empty());
}

#[tokio::test]
async fn exhausted_link_retries_leave_a_detectable_orphan() {
  let s = store().await;
  let users = Arc::new(FlakyUsers::new(s.clone(), u32::MAX));
  let c = Coordinator::new(
    Arc::new(s.clone()),
    users.clone(),
    Arc::new(FixedGateway::new(FACTS)),
    quick_config(),
  );

  let err = c.create_case("user_1", CaseKind::New).await.unwrap_err();
  let CoreError::CaseUnlinked { case_id, ref owner_id, .. } = err else {
    panic!("expected CaseUnlinked, got {err:?}");
  };
  assert_eq!(owner_id, "user_1");
  assert_eq!(err.kind(), ErrorKind::Persistence);
  assert_eq!(users.add_ongoing_calls(), 3);

  // The case is kept, not rolled back.
  let stored = s.get_case(case_id).await.unwrap().unwrap();
  assert_eq!(stored.status, CaseStatus::Ongoing);

  let orphans = c.unlinked_cases().await.unwrap();
  assert_eq!(orphans.len(), 1);
  assert_eq!(orphans[0].case_id, case_id);
}

// ─── Submit ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_completes_and_credits_kind_hours() {
  let s = store().await;
  let c = coordinator(&s, FixedGateway::new(FACTS));
  let id = owned_case(&c, "user_1", CaseKind::Litigate).await;

  let outcome = c.submit_case(id, "user_1").await.unwrap();
  assert!(outcome.newly_completed);
  assert_eq!(outcome.hours_credited, 75);
  assert_eq!(outcome.case.status, CaseStatus::Completed);
  assert!(outcome.case.submitted_at.is_some());

  let user = s.get_user("user_1".into()).await.unwrap().unwrap();
  assert_eq!(user.total_hours, 75);
  assert!(user.ongoing_case_ids.is_empty());
  assert_eq!(user.completed_case_ids, vec![id]);
}

#[tokio::test]
async fn hours_follow_the_kind_table() {
  let s = store().await;
  let c = coordinator(&s, FixedGateway::new(FACTS));

  for (kind, hours) in [
    (CaseKind::New, 50),
    (CaseKind::Litigate, 75),
    (CaseKind::Judge, 50),
    (CaseKind::Grade, 25),
  ] {
    let id = owned_case(&c, "user_1", kind).await;
    let outcome = c.submit_case(id, "user_1").await.unwrap();
    assert_eq!(outcome.hours_credited, hours, "{kind}");
  }

  let user = s.get_user("user_1".into()).await.unwrap().unwrap();
  assert_eq!(user.total_hours, 200);
  assert_eq!(user.completed_case_ids.len(), 4);
  assert_partitioned(&user);
}

#[tokio::test]
async fn unrecognized_kind_credits_nothing() {
  let s = store().await;
  let c = coordinator(&s, FixedGateway::new(FACTS));
  let id = owned_case(&c, "user_1", CaseKind::Unrecognized).await;

  let outcome = c.submit_case(id, "user_1").await.unwrap();
  assert!(outcome.newly_completed);
  assert_eq!(outcome.hours_credited, 0);

  let user = s.get_user("user_1".into()).await.unwrap().unwrap();
  assert_eq!(user.total_hours, 0);
  assert_eq!(user.completed_case_ids, vec![id]);
}

#[tokio::test]
async fn repeat_submit_is_a_no_op_success() {
  let s = store().await;
  let c = coordinator(&s, FixedGateway::new(FACTS));
  let id = owned_case(&c, "user_1", CaseKind::New).await;

  let first = c.submit_case(id, "user_1").await.unwrap();
  let second = c.submit_case(id, "user_1").await.unwrap();

  assert!(!second.newly_completed);
  assert_eq!(second.hours_credited, 0);
  assert_eq!(second.case, first.case);

  let user = s.get_user("user_1".into()).await.unwrap().unwrap();
  assert_eq!(user.total_hours, 50);
  assert_eq!(user.completed_case_ids, vec![id]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_submits_credit_exactly_once() {
  let s = store().await;
  let c = Arc::new(coordinator(&s, FixedGateway::new(FACTS)));
  let id = owned_case(&c, "user_1", CaseKind::Litigate).await;

  let tasks: Vec<_> = (0..16)
    .map(|_| {
      let c = c.clone();
      tokio::spawn(async move { c.submit_case(id, "user_1").await })
    })
    .collect();

  let mut transitions = 0;
  let mut credited = 0;
  for t in tasks {
    let outcome = t.await.unwrap().unwrap();
    if outcome.newly_completed {
      transitions += 1;
    }
    credited += outcome.hours_credited;
  }

  assert_eq!(transitions, 1);
  assert_eq!(credited, 75);
  let user = s.get_user("user_1".into()).await.unwrap().unwrap();
  assert_eq!(user.total_hours, 75);
  assert_eq!(user.completed_case_ids, vec![id]);
  assert_partitioned(&user);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submits_of_different_cases_all_apply() {
  let s = store().await;
  let c = Arc::new(coordinator(&s, FixedGateway::new(FACTS)));

  let mut ids = Vec::new();
  for _ in 0..6 {
    ids.push(owned_case(&c, "user_1", CaseKind::Grade).await);
  }

  let tasks: Vec<_> = ids
    .iter()
    .map(|&id| {
      let c = c.clone();
      tokio::spawn(async move { c.submit_case(id, "user_1").await })
    })
    .collect();
  for t in tasks {
    assert!(t.await.unwrap().unwrap().newly_completed);
  }

  let user = s.get_user("user_1".into()).await.unwrap().unwrap();
  assert_eq!(user.total_hours, 6 * 25);
  assert_eq!(user.completed_case_ids.len(), ids.len());
  assert!(user.ongoing_case_ids.is_empty());
}

#[tokio::test]
async fn submit_by_non_owner_is_forbidden_and_changes_nothing() {
  let s = store().await;
  let c = coordinator(&s, FixedGateway::new(FACTS));
  let id = owned_case(&c, "user_1", CaseKind::New).await;
  s.ensure_user("user_2".into()).await.unwrap();

  let err = c.submit_case(id, "user_2").await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);

  let case = s.get_case(id).await.unwrap().unwrap();
  assert_eq!(case.status, CaseStatus::Ongoing);
  let owner = s.get_user("user_1".into()).await.unwrap().unwrap();
  assert_eq!(owner.ongoing_case_ids, vec![id]);
  let other = s.get_user("user_2".into()).await.unwrap().unwrap();
  assert_eq!(other.total_hours, 0);
}

#[tokio::test]
async fn submit_missing_case_is_not_found() {
  let s = store().await;
  let c = coordinator(&s, FixedGateway::new(FACTS));

  let err = c.submit_case(Uuid::new_v4(), "user_1").await.unwrap_err();
  assert!(matches!(err, CoreError::CaseNotFound(_)));
}

#[tokio::test]
async fn submit_requires_user() {
  let s = store().await;
  let c = coordinator(&s, FixedGateway::new(FACTS));
  let id = owned_case(&c, "user_1", CaseKind::New).await;

  let err = c.submit_case(id, "").await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidRequest);
  assert_eq!(s.get_case(id).await.unwrap().unwrap().status, CaseStatus::Ongoing);
}

#[tokio::test]
async fn unlinked_case_submit_surfaces_consistency_error() {
  let s = store().await;
  let c = coordinator(&s, FixedGateway::new(FACTS));
  // Persisted but never linked into the owner's sets.
  let case = s
    .create_case(NewCase {
      owner_id: "user_1".into(),
      kind:     CaseKind::New,
      content:  FACTS.into(),
    })
    .await
    .unwrap();
  s.ensure_user("user_1".into()).await.unwrap();

  let err = c.submit_case(case.case_id, "user_1").await.unwrap_err();
  assert!(matches!(err, CoreError::Consistency { case_id, .. } if case_id == case.case_id));
  assert_eq!(err.kind(), ErrorKind::Consistency);

  // Status is the source of truth and stays completed.
  let stored = s.get_case(case.case_id).await.unwrap().unwrap();
  assert_eq!(stored.status, CaseStatus::Completed);
  let user = s.get_user("user_1".into()).await.unwrap().unwrap();
  assert_eq!(user.total_hours, 0);
  assert!(user.completed_case_ids.is_empty());
}

#[tokio::test]
async fn exhausted_promote_retries_leave_a_detectable_completion() {
  let s = store().await;
  let users = Arc::new(FlakyUsers::failing_promotes(s.clone(), u32::MAX));
  let c = Coordinator::new(
    Arc::new(s.clone()),
    users.clone(),
    Arc::new(FixedGateway::new(FACTS)),
    quick_config(),
  );
  let id = c.create_case("user_1", CaseKind::Litigate).await.unwrap().case_id;

  let err = c.submit_case(id, "user_1").await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Persistence);

  // The swap already happened, so a repeat submit credits nothing.
  let again = c.submit_case(id, "user_1").await.unwrap();
  assert!(!again.newly_completed);
  assert_eq!(again.hours_credited, 0);
  assert_eq!(again.case.status, CaseStatus::Completed);

  let user = s.get_user("user_1".into()).await.unwrap().unwrap();
  assert_eq!(user.total_hours, 0);
  assert_eq!(user.ongoing_case_ids, vec![id]);
  assert_partitioned(&user);

  // The stranded completion is reported for reconciliation.
  let stranded = c.unlinked_cases().await.unwrap();
  assert_eq!(stranded.len(), 1);
  assert_eq!(stranded[0].case_id, id);
  assert_eq!(stranded[0].status, CaseStatus::Completed);

  // Once the owner record catches up the case drops out of the scan.
  assert!(s.promote_to_completed("user_1".into(), id, 75).await.unwrap());
  assert!(c.unlinked_cases().await.unwrap().is_empty());
  assert_eq!(s.get_user("user_1".into()).await.unwrap().unwrap().total_hours, 75);
}
