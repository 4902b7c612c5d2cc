//! Extractors whose rejections are [`ApiError`]s, so malformed bodies, query
//! strings and path segments get the same `{"error": ...}` body as every
//! other failure.

use axum::{
  extract::{FromRequest, FromRequestParts},
  http::Method,
  response::{IntoResponse, Response},
};
use bizhub_core::verb::Verb;
use serde::Serialize;

use crate::error::ApiError;

/// JSON request body; also usable as a JSON response.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
  fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

/// The verb a request method asks the policies about.
///
/// axum serves `HEAD` from `GET` routes, so read handlers take the method
/// instead of assuming `GET`.
pub fn verb_of(method: &Method) -> Result<Verb, ApiError> {
  let verb = match *method {
    Method::GET => Verb::Get,
    Method::HEAD => Verb::Head,
    Method::OPTIONS => Verb::Options,
    Method::POST => Verb::Post,
    Method::PUT => Verb::Put,
    Method::PATCH => Verb::Patch,
    Method::DELETE => Verb::Delete,
    _ => return Err(ApiError::BadRequest(format!("unsupported method {method}"))),
  };
  Ok(verb)
}
