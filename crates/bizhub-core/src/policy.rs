//! Authorization policies.
//!
//! Each policy is a stateless decision over a [`Principal`], an optional
//! target record and a [`Verb`]. A denial is a `false`, never an error; the
//! dispatcher decides what response a denial becomes.

use std::{collections::BTreeSet, fmt};

use crate::{
  Id,
  principal::Principal,
  record::{FeedItem, Owned, UserProfile},
  verb::Verb,
};

// ─── Request ─────────────────────────────────────────────────────────────────

/// One authorization question: may `principal` perform `verb` on `resource`?
///
/// `resource` is `None` for list and create requests.
#[derive(Debug)]
pub struct ActionRequest<'a, R: ?Sized> {
  pub principal: &'a Principal,
  pub resource:  Option<&'a R>,
  pub verb:      Verb,
}

impl<'a, R: ?Sized> ActionRequest<'a, R> {
  pub fn on(principal: &'a Principal, resource: &'a R, verb: Verb) -> Self {
    Self { principal, resource: Some(resource), verb }
  }

  pub fn collection(principal: &'a Principal, verb: Verb) -> Self {
    Self { principal, resource: None, verb }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// A capability that answers [`ActionRequest`]s about records of type `R`.
pub trait Policy<R: ?Sized> {
  fn permits(&self, request: &ActionRequest<'_, R>) -> bool;

  /// Short name used when logging a denial.
  fn name(&self) -> &str;
}

// ─── Ownership ───────────────────────────────────────────────────────────────

/// Lets anyone read, and only the owner mutate.
///
/// The owner id is resolved through an accessor, so records that carry the
/// owner directly and records whose owner sits one hop away share this one
/// implementation.
pub struct OwnershipPolicy<R> {
  name:     &'static str,
  owner_of: fn(&R) -> Id,
}

impl<R> OwnershipPolicy<R> {
  pub fn new(name: &'static str, owner_of: fn(&R) -> Id) -> Self {
    Self { name, owner_of }
  }

  pub fn owner_of(&self, resource: &R) -> Id { (self.owner_of)(resource) }

  pub fn allows(&self, principal: &Principal, resource: &R, verb: Verb) -> bool {
    if verb.is_safe() {
      return true;
    }
    principal.id() == Some(self.owner_of(resource))
  }
}

impl<R: Owned> OwnershipPolicy<R> {
  /// Ownership through the record's own [`Owned::owner_id`].
  pub fn owned() -> Self { Self::new("update-own-record", R::owner_id) }
}

impl OwnershipPolicy<UserProfile> {
  /// A profile is owned by the user it describes.
  pub fn own_profile() -> Self { Self::new("update-own-profile", |profile| profile.id) }
}

impl OwnershipPolicy<FeedItem> {
  /// A feed item is owned by the owner of the profile it was posted to.
  pub fn own_status() -> Self { Self::new("update-own-status", |item| item.user_profile) }
}

impl<R> Clone for OwnershipPolicy<R> {
  fn clone(&self) -> Self { *self }
}

impl<R> Copy for OwnershipPolicy<R> {}

impl<R> fmt::Debug for OwnershipPolicy<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OwnershipPolicy").field("name", &self.name).finish_non_exhaustive()
  }
}

impl<R> Policy<R> for OwnershipPolicy<R> {
  fn permits(&self, request: &ActionRequest<'_, R>) -> bool {
    // Object-level check only; list and create have no object yet.
    match request.resource {
      Some(resource) => self.allows(request.principal, resource, request.verb),
      None => true,
    }
  }

  fn name(&self) -> &str { self.name }
}

// ─── Role gate ───────────────────────────────────────────────────────────────

/// Admits authenticated members of one role, for a fixed set of verbs.
///
/// Runs before any record is fetched; the target record is never consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGate {
  required_role: String,
  allowed_verbs: BTreeSet<Verb>,
}

impl RoleGate {
  /// Read and create only. Update and delete are never in the default list.
  pub const DEFAULT_VERBS: [Verb; 2] = [Verb::Get, Verb::Post];

  pub fn new(required_role: impl Into<String>) -> Self {
    Self {
      required_role: required_role.into(),
      allowed_verbs: Self::DEFAULT_VERBS.into_iter().collect(),
    }
  }

  /// Replace the allow-list.
  pub fn with_verbs(mut self, verbs: impl IntoIterator<Item = Verb>) -> Self {
    self.allowed_verbs = verbs.into_iter().collect();
    self
  }

  pub fn required_role(&self) -> &str { &self.required_role }

  pub fn allowed_verbs(&self) -> &BTreeSet<Verb> { &self.allowed_verbs }

  pub fn allows(&self, principal: &Principal, verb: Verb) -> bool {
    principal.is_authenticated()
      && principal.has_role(&self.required_role)
      && self.allowed_verbs.contains(&verb)
  }
}

impl<R: ?Sized> Policy<R> for RoleGate {
  fn permits(&self, request: &ActionRequest<'_, R>) -> bool {
    self.allows(request.principal, request.verb)
  }

  fn name(&self) -> &str { "role-gate" }
}

// ─── Authentication ──────────────────────────────────────────────────────────

/// Admits any authenticated principal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

impl<R: ?Sized> Policy<R> for Authenticated {
  fn permits(&self, request: &ActionRequest<'_, R>) -> bool {
    request.principal.is_authenticated()
  }

  fn name(&self) -> &str { "is-authenticated" }
}
