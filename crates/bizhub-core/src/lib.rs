//! Core types, authorization policies and the collection filter for Bizhub.
//!
//! This crate has no HTTP or database dependencies.
//! The API crate consults the policies here before it mutates anything, and
//! asks [`filter::CollectionFilter`] for a [`filter::Predicate`] before it
//! lists anything. Storage backends execute that predicate.

pub mod error;
pub mod filter;
pub mod policy;
pub mod principal;
pub mod record;
pub mod store;
pub mod verb;

pub use error::{Error, Result};

/// Identifier of any persisted record. Assigned by the store.
pub type Id = i64;
