//! Handlers for `/cases` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/cases` | Body: `{"user_id":"...","kind":"litigate"}`; `kind` defaults to `new`; returns 201 |
//! | `GET`  | `/cases/:id` | 404 if not found |
//! | `POST` | `/cases/:id/submit` | Body: `{"user_id":"..."}`; idempotent |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use casework_core::{
  Error, SubmitOutcome,
  case::{Case, CaseKind},
  error::parse_id,
  gateway::GenerationGateway,
  store::CaseRegistry,
};
use serde::Deserialize;

use crate::{ApiState, Store, error::ApiError, extract::JsonBody};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub user_id: Option<String>,
  pub kind:    Option<String>,
}

fn parse_kind(kind: Option<&str>) -> Result<CaseKind, Error> {
  let Some(raw) = kind.map(str::trim).filter(|k| !k.is_empty()) else {
    return Ok(CaseKind::default());
  };
  match CaseKind::parse(raw) {
    CaseKind::Unrecognized => Err(Error::InvalidRequest(format!("unknown case kind: {raw:?}"))),
    kind => Ok(kind),
  }
}

/// `POST /cases`: generates the fact pattern and links the case as ongoing.
pub async fn create<S, G>(
  State(state): State<ApiState<S, G>>,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store,
  G: GenerationGateway + 'static,
{
  let kind = parse_kind(body.kind.as_deref())?;
  let case = state
    .coordinator
    .create_case(body.user_id.as_deref().unwrap_or_default(), kind)
    .await?;
  Ok((StatusCode::CREATED, Json(case)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /cases/:id`
pub async fn get_one<S, G>(
  State(state): State<ApiState<S, G>>,
  Path(id): Path<String>,
) -> Result<Json<Case>, ApiError>
where
  S: Store,
  G: GenerationGateway + 'static,
{
  let case_id = parse_id("case_id", Some(&id))?;
  let case = CaseRegistry::get_case(&*state.store, case_id)
    .await
    .map_err(ApiError::store)?
    .ok_or(Error::CaseNotFound(case_id))?;
  Ok(Json(case))
}

// ─── Submit ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub user_id: Option<String>,
}

/// `POST /cases/:id/submit`: completes the case and credits its hours once.
pub async fn submit<S, G>(
  State(state): State<ApiState<S, G>>,
  Path(id): Path<String>,
  JsonBody(body): JsonBody<SubmitBody>,
) -> Result<Json<SubmitOutcome>, ApiError>
where
  S: Store,
  G: GenerationGateway + 'static,
{
  let case_id = parse_id("case_id", Some(&id))?;
  let outcome = state
    .coordinator
    .submit_case(case_id, body.user_id.as_deref().unwrap_or_default())
    .await?;
  Ok(Json(outcome))
}
