//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use bizhub_core::store::StoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("authentication credentials were not provided")]
  Unauthorized,

  #[error("invalid token")]
  InvalidToken,

  #[error("you do not have permission to perform this action")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a backend failure. Rejections of caller input become client
  /// errors; anything else is logged and the client only sees a 500.
  pub fn store<E: StoreError>(err: E) -> Self {
    if let Some(domain) = err.as_domain() {
      tracing::debug!(error = %domain, "store rejected input");
      return ApiError::domain(domain);
    }
    tracing::error!(error = %err, "record store failure");
    ApiError::Store(Box::new(err))
  }

  fn domain(err: &bizhub_core::Error) -> Self {
    match err {
      bizhub_core::Error::Unauthenticated => ApiError::Unauthorized,
      other => ApiError::BadRequest(other.to_string()),
    }
  }
}

impl From<bizhub_core::Error> for ApiError {
  fn from(err: bizhub_core::Error) -> Self { ApiError::domain(&err) }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Unauthorized | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
    }
    res
  }
}
