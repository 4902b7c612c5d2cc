//! Handlers for `/business` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/business` | Caller's own; `?tag=1,2`, `?task=3`, `?ordering=` |
//! | `POST`   | `/business` | Body: [`NewBusiness`]; linked ids must be the caller's |
//! | `GET`    | `/business/:id` | [`BusinessDetail`]; 404 unless owned by the caller |
//! | `PUT`    | `/business/:id` | Owner only; `title` required, missing sets are cleared |
//! | `PATCH`  | `/business/:id` | Owner only; any subset of fields |
//! | `DELETE` | `/business/:id` | Owner only |
//!
//! When the deployment configures a role gate it is checked on every endpoint
//! here, before any record is read.

use std::collections::BTreeSet;

use axum::{
  extract::State,
  http::{Method, StatusCode},
  response::IntoResponse,
};
use bizhub_core::{
  Id,
  filter::{Collection, CollectionFilter, ListParams},
  policy::{ActionRequest, OwnershipPolicy},
  principal::Principal,
  record::{Business, BusinessDetail, BusinessUpdate, NewBusiness},
  store::RecordStore,
  verb::Verb,
};

use crate::{
  AppState,
  auth::CurrentPrincipal,
  error::ApiError,
  extract::{Json, Path, Query, verb_of},
  guard::{authorize, require_authenticated},
};

/// Authentication, then the role gate if one is configured.
fn admit<S>(state: &AppState<S>, principal: &Principal, verb: Verb, view: &str) -> Result<(), ApiError>
where
  S: RecordStore,
{
  require_authenticated(principal, verb)?;
  if let Some(gate) = &state.role_gate {
    tracing::debug!(view, role = gate.required_role(), %verb, "checking role gate");
    authorize::<Business, _>(gate.as_ref(), &ActionRequest::collection(principal, verb))?;
  }
  Ok(())
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /business[?tag=<ids>][&task=<ids>][&ordering=<field>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  method: Method,
  CurrentPrincipal(principal): CurrentPrincipal,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Business>>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  admit(&state, &principal, verb_of(&method)?, "business-list")?;
  let predicate =
    CollectionFilter::for_collection(Collection::Businesses).build(&principal, &params)?;
  let rows = state
    .store
    .list_businesses(&predicate)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /business`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<NewBusiness>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  admit(&state, &principal, Verb::Post, "business-list")?;
  let owner = principal.id().ok_or(ApiError::Unauthorized)?;
  let body = body.validated()?;
  // Linked tags and tasks are checked against `owner` by the store, in the
  // same transaction as the write.
  let created = state
    .store
    .create_business(owner, body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(created)))
}

// ─── Retrieve ─────────────────────────────────────────────────────────────────

/// `GET /business/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  method: Method,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Id>,
) -> Result<Json<BusinessDetail>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  admit(&state, &principal, verb_of(&method)?, "business-detail")?;
  let detail = state
    .store
    .get_business_detail(id)
    .await
    .map_err(ApiError::store)?
    // Retrieval is scoped like listing: other users' records do not exist.
    .filter(|d| principal.id() == Some(d.user))
    .ok_or_else(|| ApiError::NotFound(format!("business {id} not found")))?;
  Ok(Json(detail))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /business/:id`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Id>,
  Json(mut body): Json<BusinessUpdate>,
) -> Result<Json<Business>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  if body.title.is_none() {
    return Err(ApiError::BadRequest("`title` is required".into()));
  }
  body.tag.get_or_insert_with(BTreeSet::new);
  body.task.get_or_insert_with(BTreeSet::new);
  apply_update(&state, &principal, id, body, Verb::Put).await
}

/// `PATCH /business/:id`
pub async fn partial_update<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Id>,
  Json(body): Json<BusinessUpdate>,
) -> Result<Json<Business>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  apply_update(&state, &principal, id, body, Verb::Patch).await
}

async fn apply_update<S>(
  state: &AppState<S>,
  principal: &Principal,
  id: Id,
  body: BusinessUpdate,
  verb: Verb,
) -> Result<Json<Business>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  admit(state, principal, verb, "business-detail")?;
  let business = fetch(state, id).await?;
  authorize(&OwnershipPolicy::<Business>::owned(), &ActionRequest::on(principal, &business, verb))?;

  let body = body.validated()?;
  let updated = state
    .store
    .update_business(id, body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("business {id} not found")))?;
  Ok(Json(updated))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /business/:id`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Path(id): Path<Id>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  admit(&state, &principal, Verb::Delete, "business-detail")?;
  let business = fetch(&state, id).await?;
  authorize(
    &OwnershipPolicy::<Business>::owned(),
    &ActionRequest::on(&principal, &business, Verb::Delete),
  )?;
  state.store.delete_business(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

async fn fetch<S>(state: &AppState<S>, id: Id) -> Result<Business, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .get_business(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("business {id} not found")))
}
