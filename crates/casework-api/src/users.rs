//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users/:id` | Creates a zero-state record on first access |
//! | `GET`  | `/users/:id/cases` | Cases owned by the user, newest first |

use axum::{
  Json,
  extract::{Path, State},
};
use casework_core::{
  case::Case,
  error::require,
  gateway::GenerationGateway,
  store::{CaseRegistry, UserProgressStore},
  user::User,
};

use crate::{ApiState, Store, error::ApiError};

/// `GET /users/:id`
pub async fn get_or_create<S, G>(
  State(state): State<ApiState<S, G>>,
  Path(id): Path<String>,
) -> Result<Json<User>, ApiError>
where
  S: Store,
  G: GenerationGateway + 'static,
{
  let user_id = require("user_id", Some(&id))?;
  let user = UserProgressStore::ensure_user(&*state.store, user_id.to_owned())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(user))
}

/// `GET /users/:id/cases`
pub async fn list_cases<S, G>(
  State(state): State<ApiState<S, G>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<Case>>, ApiError>
where
  S: Store,
  G: GenerationGateway + 'static,
{
  let user_id = require("user_id", Some(&id))?;
  let cases = CaseRegistry::list_cases_for_owner(&*state.store, user_id.to_owned())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(cases))
}
