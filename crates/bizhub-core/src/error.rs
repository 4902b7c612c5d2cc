//! Error types for `bizhub-core`.

use thiserror::Error;

use crate::{Id, record::Relation};

#[derive(Debug, Error)]
pub enum Error {
  /// A caller-supplied filter parameter could not be interpreted.
  #[error("invalid value {value:?} for filter parameter `{param}`")]
  InvalidFilterValue { param: String, value: String },

  #[error("authentication credentials were not provided")]
  Unauthenticated,

  #[error("{field} may not be blank")]
  Blank { field: &'static str },

  #[error("{relation} {id} does not exist or belongs to another user")]
  UnknownRelated { relation: Relation, id: Id },

  #[error("a profile with email {0:?} already exists")]
  DuplicateEmail(String),
}

impl Error {
  pub(crate) fn invalid_filter(param: &str, value: &str) -> Self {
    Self::InvalidFilterValue { param: param.to_owned(), value: value.to_owned() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
