//! Handlers for the append-only artifact logs.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/analyses` | Body: [`AnalysisBody`]; returns 201 |
//! | `POST` | `/submissions` | Body: [`SubmissionBody`]; returns 201 |
//! | `GET`  | `/submissions` | `?case_id` required; oldest first |
//! | `POST` | `/grades` | Body: [`GradeBody`]; score in `0..=100`; returns 201 |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use casework_core::{
  Error,
  artifact::{NewAnalysis, NewGrade, NewSubmission, Side, Submission},
  error::{parse_id, require},
  gateway::GenerationGateway,
  store::{ArtifactStore, CaseRegistry},
};
use serde::Deserialize;

use crate::{ApiState, Store, error::ApiError, extract::JsonBody};

// ─── Analyses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalysisBody {
  pub case_id: Option<String>,
  pub user_id: Option<String>,
  pub content: Option<String>,
}

impl TryFrom<AnalysisBody> for NewAnalysis {
  type Error = Error;

  fn try_from(b: AnalysisBody) -> Result<Self, Error> {
    Ok(NewAnalysis {
      case_id: parse_id("case_id", b.case_id.as_deref())?,
      user_id: require("user_id", b.user_id.as_deref())?.to_owned(),
      content: require("content", b.content.as_deref())?.to_owned(),
    })
  }
}

/// `POST /analyses`
pub async fn record_analysis<S, G>(
  State(state): State<ApiState<S, G>>,
  JsonBody(body): JsonBody<AnalysisBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store,
  G: GenerationGateway + 'static,
{
  let input = NewAnalysis::try_from(body)?;
  let analysis = state.store.record_analysis(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(analysis)))
}

// ─── Submissions ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmissionBody {
  pub case_id:  Option<String>,
  pub user_id:  Option<String>,
  /// `plaintiff` or `defendant`.
  pub side:     Option<String>,
  pub argument: Option<String>,
}

impl TryFrom<SubmissionBody> for NewSubmission {
  type Error = Error;

  fn try_from(b: SubmissionBody) -> Result<Self, Error> {
    Ok(NewSubmission {
      case_id:  parse_id("case_id", b.case_id.as_deref())?,
      user_id:  require("user_id", b.user_id.as_deref())?.to_owned(),
      side:     Side::parse(require("side", b.side.as_deref())?)?,
      argument: require("argument", b.argument.as_deref())?.to_owned(),
    })
  }
}

/// `POST /submissions`
pub async fn record_submission<S, G>(
  State(state): State<ApiState<S, G>>,
  JsonBody(body): JsonBody<SubmissionBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store,
  G: GenerationGateway + 'static,
{
  let input = NewSubmission::try_from(body)?;
  let submission = state.store.record_submission(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(submission)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub case_id: Option<String>,
}

/// `GET /submissions?case_id=<id>`
pub async fn list_submissions<S, G>(
  State(state): State<ApiState<S, G>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Submission>>, ApiError>
where
  S: Store,
  G: GenerationGateway + 'static,
{
  let case_id = parse_id("case_id", params.case_id.as_deref())?;
  if CaseRegistry::get_case(&*state.store, case_id)
    .await
    .map_err(ApiError::store)?
    .is_none()
  {
    return Err(Error::CaseNotFound(case_id).into());
  }

  let mut submissions = state.store.list_submissions(case_id).await.map_err(ApiError::store)?;
  submissions.sort_by_key(|s| s.submitted_at);
  Ok(Json(submissions))
}

// ─── Grades ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GradeBody {
  pub submission_id: Option<String>,
  pub grader_id:     Option<String>,
  /// Wider than the stored type so out-of-range values reach validation
  /// instead of failing deserialisation.
  pub score:         Option<i64>,
  #[serde(default)]
  pub feedback:      String,
}

impl TryFrom<GradeBody> for NewGrade {
  type Error = Error;

  fn try_from(b: GradeBody) -> Result<Self, Error> {
    let score = b.score.ok_or_else(|| Error::InvalidRequest("score is required".into()))?;
    let score = u8::try_from(score)
      .map_err(|_| Error::InvalidRequest(format!("score must be between 0 and 100, got {score}")))?;
    let grade = NewGrade {
      submission_id: parse_id("submission_id", b.submission_id.as_deref())?,
      grader_id: require("grader_id", b.grader_id.as_deref())?.to_owned(),
      score,
      feedback: b.feedback,
    };
    grade.validate()?;
    Ok(grade)
  }
}

/// `POST /grades`
pub async fn record_grade<S, G>(
  State(state): State<ApiState<S, G>>,
  JsonBody(body): JsonBody<GradeBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store,
  G: GenerationGateway + 'static,
{
  let input = NewGrade::try_from(body)?;
  let grade = state.store.record_grade(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(grade)))
}
