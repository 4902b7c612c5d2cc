//! Handlers for `/feed` endpoints: status items posted by profiles.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/feed` | Newest first |
//! | `POST`   | `/feed` | Body: `{"status_text":"..."}`; posted as the caller |
//! | `GET`    | `/feed/:id` | |
//! | `PUT`    | `/feed/:id` | Owner of the posting profile only |
//! | `PATCH`  | `/feed/:id` | Same as `PUT`; there is one editable field |
//! | `DELETE` | `/feed/:id` | Owner of the posting profile only |
//!
//! Every endpoint requires authentication.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use bizhub_core::{
  Id,
  policy::{ActionRequest, OwnershipPolicy},
  principal::Principal,
  record::{FeedItem, non_blank},
  store::RecordStore,
  verb::Verb,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::CurrentPrincipal,
  error::ApiError,
  extract::{Json, Path},
  guard::{authorize, require_authenticated},
};

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status_text: String,
}

/// `GET /feed`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<Vec<FeedItem>>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  require_authenticated(&principal, Verb::Get)?;
  let items = state.store.list_feed_items().await.map_err(ApiError::store)?;
  Ok(Json(items))
}

/// `POST /feed`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<StatusBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  require_authenticated(&principal, Verb::Post)?;
  let owner = principal.id().ok_or(ApiError::Unauthorized)?;
  let text = non_blank("status_text", &body.status_text)?.to_owned();
  let item = state
    .store
    .create_feed_item(owner, text)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /feed/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Id>,
) -> Result<Json<FeedItem>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  require_authenticated(&principal, Verb::Get)?;
  Ok(Json(fetch(&state, id).await?))
}

/// `PUT /feed/:id`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Id>,
  Json(body): Json<StatusBody>,
) -> Result<Json<FeedItem>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  apply_update(&state, &principal, id, body, Verb::Put).await
}

/// `PATCH /feed/:id`
pub async fn partial_update<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Id>,
  Json(body): Json<StatusBody>,
) -> Result<Json<FeedItem>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  apply_update(&state, &principal, id, body, Verb::Patch).await
}

async fn apply_update<S>(
  state: &AppState<S>,
  principal: &Principal,
  id: Id,
  body: StatusBody,
  verb: Verb,
) -> Result<Json<FeedItem>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  require_authenticated(principal, verb)?;
  let item = fetch(state, id).await?;
  authorize(&OwnershipPolicy::own_status(), &ActionRequest::on(principal, &item, verb))?;

  let text = non_blank("status_text", &body.status_text)?.to_owned();
  let updated = state
    .store
    .update_feed_item(id, text)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("feed item {id} not found")))?;
  Ok(Json(updated))
}

/// `DELETE /feed/:id`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Id>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  require_authenticated(&principal, Verb::Delete)?;
  let item = fetch(&state, id).await?;
  authorize(
    &OwnershipPolicy::own_status(),
    &ActionRequest::on(&principal, &item, Verb::Delete),
  )?;
  state.store.delete_feed_item(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

async fn fetch<S>(state: &AppState<S>, id: Id) -> Result<FeedItem, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .get_feed_item(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("feed item {id} not found")))
}
