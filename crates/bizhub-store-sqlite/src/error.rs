//! Error type for `bizhub-store-sqlite`.

use bizhub_core::{filter::Collection, store::StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Input rejected by a domain rule, possibly inside a transaction.
  #[error("core error: {0}")]
  Core(#[from] bizhub_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("profile not found: {0}")]
  UserNotFound(i64),

  /// A predicate for one collection was handed to another collection's query.
  #[error("predicate for {0:?} cannot list this collection")]
  WrongCollection(Collection),
}

impl StoreError for Error {
  fn as_domain(&self) -> Option<&bizhub_core::Error> {
    match self {
      Error::Core(err) => Some(err),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
