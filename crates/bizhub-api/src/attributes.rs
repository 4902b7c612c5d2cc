//! Handlers for the `/tags` and `/tasks` collections.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/tags`, `/tasks` | Caller's own records; `?assigned_only=1`, `?ordering=` |
//! | `POST` | `/tags`, `/tasks` | Body: `{"name":"..."}`; owned by the caller |

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use bizhub_core::{
  filter::{Collection, CollectionFilter, ListParams},
  record::{Attribute, Relation, non_blank},
  store::RecordStore,
  verb::Verb,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::CurrentPrincipal,
  error::ApiError,
  extract::{Json, Query},
  guard::require_authenticated,
};

/// Selects which attribute table a handler serves.
pub trait AttributeKind: Send + Sync + 'static {
  const RELATION: Relation;
  const COLLECTION: Collection;
}

pub struct Tags;
pub struct Tasks;

impl AttributeKind for Tags {
  const RELATION: Relation = Relation::Tag;
  const COLLECTION: Collection = Collection::Tags;
}

impl AttributeKind for Tasks {
  const RELATION: Relation = Relation::Task;
  const COLLECTION: Collection = Collection::Tasks;
}

/// `GET /tags` or `GET /tasks`
pub async fn list<S, K>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Attribute>>, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
  K: AttributeKind,
{
  require_authenticated(&principal, Verb::Get)?;
  let predicate = CollectionFilter::for_collection(K::COLLECTION).build(&principal, &params)?;
  let rows = state
    .store
    .list_attributes(&predicate)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name: String,
}

/// `POST /tags` or `POST /tasks`
pub async fn create<S, K>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + Clone + Send + Sync + 'static,
  K: AttributeKind,
{
  require_authenticated(&principal, Verb::Post)?;
  let owner = principal.id().ok_or(ApiError::Unauthorized)?;
  let name = non_blank("name", &body.name)?.to_owned();
  let created = state
    .store
    .create_attribute(K::RELATION, owner, name)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(created)))
}
