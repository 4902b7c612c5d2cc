//! Handlers for `/profiles` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/profiles` | Optional `?search=` over name and email |
//! | `GET`    | `/profiles/:id` | 404 if not found |
//! | `PUT`    | `/profiles/:id` | Owner only; body needs `email` and `name` |
//! | `PATCH`  | `/profiles/:id` | Owner only; any subset of fields |
//! | `DELETE` | `/profiles/:id` | Owner only |
//!
//! Profiles are readable by anyone, including anonymous callers.

use axum::{extract::State, http::StatusCode};
use bizhub_core::{
  Id,
  policy::{ActionRequest, OwnershipPolicy},
  principal::Principal,
  record::{ProfileUpdate, UserProfile},
  store::RecordStore,
  verb::Verb,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::CurrentPrincipal,
  error::ApiError,
  extract::{Json, Path, Query},
  guard::authorize,
};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub search: Option<String>,
}

/// `GET /profiles[?search=<text>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<UserProfile>>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let search = params.search.as_deref().filter(|s| !s.trim().is_empty());
  let users = state.store.list_users(search).await.map_err(ApiError::store)?;
  Ok(Json(users))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /profiles/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Id>,
) -> Result<Json<UserProfile>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  Ok(Json(fetch(&state, id).await?))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /profiles/:id`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Id>,
  Json(body): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  if body.email.is_none() || body.name.is_none() {
    return Err(ApiError::BadRequest("`email` and `name` are required".into()));
  }
  apply_update(&state, &principal, id, body, Verb::Put).await
}

/// `PATCH /profiles/:id`
pub async fn partial_update<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Id>,
  Json(body): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  apply_update(&state, &principal, id, body, Verb::Patch).await
}

async fn apply_update<S>(
  state: &AppState<S>,
  principal: &Principal,
  id: Id,
  body: ProfileUpdate,
  verb: Verb,
) -> Result<Json<UserProfile>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let profile = fetch(state, id).await?;
  authorize(&OwnershipPolicy::own_profile(), &ActionRequest::on(principal, &profile, verb))?;

  // A taken email is rejected by the store.
  let body = body.validated()?;
  let updated = state
    .store
    .update_user(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("profile {id} not found")))?;
  Ok(Json(updated))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /profiles/:id`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Id>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  let profile = fetch(&state, id).await?;
  authorize(
    &OwnershipPolicy::own_profile(),
    &ActionRequest::on(&principal, &profile, Verb::Delete),
  )?;
  state.store.delete_user(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

async fn fetch<S>(state: &AppState<S>, id: Id) -> Result<UserProfile, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("profile {id} not found")))
}
