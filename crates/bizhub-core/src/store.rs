//! The `RecordStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `bizhub-store-sqlite`).
//! The API crate depends on this abstraction, not on any concrete backend.
//!
//! Stores do not make visibility decisions. Listing methods take a
//! [`Predicate`] built by [`CollectionFilter`](crate::filter::CollectionFilter)
//! and return exactly what it describes, in its order.

use std::future::Future;

use crate::{
  Error, Id,
  filter::Predicate,
  principal::Principal,
  record::{
    Attribute, Business, BusinessDetail, BusinessUpdate, FeedItem, NewBusiness,
    NewUser, ProfileUpdate, Relation, UserProfile,
  },
};

/// A store failure that may have been caused by the caller.
///
/// Backends validate some input atomically with the write (unique emails,
/// membership ownership) and report those rejections as a domain [`Error`].
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The domain error behind this failure, if there is one.
  fn as_domain(&self) -> Option<&Error>;
}

/// Abstraction over a Bizhub record store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: StoreError;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Persist a new, active profile. A taken email fails with
  /// [`Error::DuplicateEmail`].
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<Option<UserProfile>, Self::Error>> + Send + '_;

  /// Look a profile up by its (normalised) email.
  fn find_user_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<UserProfile>, Self::Error>> + Send + '_;

  /// All profiles, by id. `search` matches name or email, case-insensitively.
  fn list_users<'a>(
    &'a self,
    search: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<UserProfile>, Self::Error>> + Send + 'a;

  /// Returns `None` if the profile does not exist. Emails stay unique.
  fn update_user(
    &self,
    id: Id,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<Option<UserProfile>, Self::Error>> + Send + '_;

  /// Delete a profile and everything it owns. Returns `false` if absent.
  fn delete_user(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Add `role` to the user's role set. Idempotent.
  fn grant_role(
    &self,
    user_id: Id,
    role: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Tokens ────────────────────────────────────────────────────────────

  /// Store the digest of a freshly issued token for `user_id`.
  fn store_token(
    &self,
    user_id: Id,
    digest: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Resolve a token digest to the principal it was issued for.
  /// Returns `None` if the digest is unknown or the user is inactive.
  fn principal_for_token(
    &self,
    digest: String,
  ) -> impl Future<Output = Result<Option<Principal>, Self::Error>> + Send + '_;

  // ── Feed items ────────────────────────────────────────────────────────

  fn create_feed_item(
    &self,
    user_profile: Id,
    status_text: String,
  ) -> impl Future<Output = Result<FeedItem, Self::Error>> + Send + '_;

  fn get_feed_item(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<Option<FeedItem>, Self::Error>> + Send + '_;

  /// All feed items, newest first.
  fn list_feed_items(
    &self,
  ) -> impl Future<Output = Result<Vec<FeedItem>, Self::Error>> + Send + '_;

  fn update_feed_item(
    &self,
    id: Id,
    status_text: String,
  ) -> impl Future<Output = Result<Option<FeedItem>, Self::Error>> + Send + '_;

  fn delete_feed_item(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Tags and tasks ────────────────────────────────────────────────────

  fn create_attribute(
    &self,
    relation: Relation,
    owner: Id,
    name: String,
  ) -> impl Future<Output = Result<Attribute, Self::Error>> + Send + '_;

  /// List the tag or task collection named by `predicate`.
  fn list_attributes<'a>(
    &'a self,
    predicate: &'a Predicate,
  ) -> impl Future<Output = Result<Vec<Attribute>, Self::Error>> + Send + 'a;

  // ── Businesses ────────────────────────────────────────────────────────

  /// Persist a business and its memberships. Every linked tag and task must
  /// belong to `owner`; otherwise nothing is written and the failure carries
  /// [`Error::UnknownRelated`].
  fn create_business(
    &self,
    owner: Id,
    input: NewBusiness,
  ) -> impl Future<Output = Result<Business, Self::Error>> + Send + '_;

  fn get_business(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<Option<Business>, Self::Error>> + Send + '_;

  /// The business with its tags and tasks expanded.
  fn get_business_detail(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<Option<BusinessDetail>, Self::Error>> + Send + '_;

  /// Apply `update`. Membership sets present in the update replace the
  /// stored ones and are subject to the same ownership rule as on create.
  fn update_business(
    &self,
    id: Id,
    update: BusinessUpdate,
  ) -> impl Future<Output = Result<Option<Business>, Self::Error>> + Send + '_;

  fn delete_business(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_businesses<'a>(
    &'a self,
    predicate: &'a Predicate,
  ) -> impl Future<Output = Result<Vec<Business>, Self::Error>> + Send + 'a;
}
