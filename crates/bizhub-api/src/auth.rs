//! Token authentication.
//!
//! Clients send `Authorization: Token <key>`. Keys are random, hex encoded,
//! and only their SHA-256 digest is ever stored. A request without the header
//! is anonymous; a request with an unknown key is rejected outright.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use bizhub_core::{Id, principal::Principal, store::RecordStore};
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};

use crate::{AppState, error::ApiError};

const TOKEN_BYTES: usize = 20;
const SCHEME: &str = "Token";

/// Generate a fresh token key.
pub fn generate_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// The stored form of a token key.
pub fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Issue a new token for `user_id` and return the key. The key itself is not
/// recoverable afterwards.
pub async fn issue_token<S: RecordStore>(store: &S, user_id: Id) -> Result<String, S::Error> {
  let token = generate_token();
  store.store_token(user_id, token_digest(&token)).await?;
  Ok(token)
}

/// Resolve the caller from request headers.
pub async fn resolve_principal<S: RecordStore>(
  headers: &HeaderMap,
  store: &S,
) -> Result<Principal, ApiError> {
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(Principal::anonymous());
  };
  let value = value.to_str().map_err(|_| ApiError::InvalidToken)?;

  let mut parts = value.split_whitespace();
  match parts.next() {
    Some(scheme) if scheme.eq_ignore_ascii_case(SCHEME) => {}
    // Some other scheme: not ours to judge.
    _ => return Ok(Principal::anonymous()),
  }
  let key = match (parts.next(), parts.next()) {
    (Some(key), None) => key,
    _ => return Err(ApiError::InvalidToken),
  };

  store
    .principal_for_token(token_digest(key))
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::InvalidToken)
}

/// The principal behind the current request; anonymous if no credentials
/// were sent.
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<AppState<S>> for CurrentPrincipal
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let principal = resolve_principal(&parts.headers, state.store.as_ref()).await?;
    Ok(CurrentPrincipal(principal))
  }
}
