//! Persisted records and the inputs used to create or change them.
//!
//! Every record has an owner reference that is fixed at creation. No update
//! input type carries an owner field, so the owner cannot be reassigned.

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Id, Result};

// ─── Ownership ───────────────────────────────────────────────────────────────

/// A record carrying its owner's id directly.
pub trait Owned {
  fn owner_id(&self) -> Id;
}

// ─── Relations ───────────────────────────────────────────────────────────────

/// A many-to-many relation between businesses and one attribute table.
///
/// The same value names the attribute collection (tags or tasks) and the
/// membership set linking it to businesses.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
  Tag,
  Task,
}

impl Relation {
  pub const ALL: [Relation; 2] = [Relation::Tag, Relation::Task];

  /// Query parameter and payload field naming this relation.
  pub fn param(self) -> &'static str {
    match self {
      Self::Tag => "tag",
      Self::Task => "task",
    }
  }
}

impl fmt::Display for Relation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.param())
  }
}

// ─── Profiles ────────────────────────────────────────────────────────────────

/// A registered user. Owns itself: its owner reference is its own id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
  pub id:        Id,
  pub email:     String,
  pub name:      String,
  pub is_active: bool,
  pub is_staff:  bool,
  #[serde(default)]
  pub roles:     BTreeSet<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub email: String,
  pub name:  String,
  #[serde(default)]
  pub is_staff: bool,
}

impl NewUser {
  /// Validate and normalise: the email must be present and is lower-cased.
  pub fn normalized(mut self) -> Result<Self> {
    self.email = non_blank("email", &self.email)?.to_lowercase();
    self.name = self.name.trim().to_owned();
    Ok(self)
  }
}

/// Fields of a profile that its owner may change. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
  pub email: Option<String>,
  pub name:  Option<String>,
}

impl ProfileUpdate {
  pub fn validated(mut self) -> Result<Self> {
    if let Some(email) = &self.email {
      self.email = Some(non_blank("email", email)?.to_lowercase());
    }
    if let Some(name) = &self.name {
      self.name = Some(name.trim().to_owned());
    }
    Ok(self)
  }
}

// ─── Feed items ──────────────────────────────────────────────────────────────

/// A status update posted to a profile's feed.
///
/// Ownership is indirect: the owner is whoever owns `user_profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
  pub id:           Id,
  pub user_profile: Id,
  pub status_text:  String,
  pub created_on:   DateTime<Utc>,
}

// ─── Attributes (tags and tasks) ─────────────────────────────────────────────

/// A named label owned by one user. Tags and tasks share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
  pub id:   Id,
  #[serde(skip_serializing)]
  pub user: Id,
  pub name: String,
}

impl Owned for Attribute {
  fn owner_id(&self) -> Id { self.user }
}

// ─── Businesses ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Business {
  pub id:    Id,
  #[serde(skip_serializing)]
  pub user:  Id,
  pub title: String,
  pub tag:   BTreeSet<Id>,
  pub task:  BTreeSet<Id>,
}

impl Business {
  /// Ids linked to this business through `relation`.
  pub fn related(&self, relation: Relation) -> &BTreeSet<Id> {
    match relation {
      Relation::Tag => &self.tag,
      Relation::Task => &self.task,
    }
  }
}

impl Owned for Business {
  fn owner_id(&self) -> Id { self.user }
}

/// A business with its tag and task ids expanded into full records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessDetail {
  pub id:    Id,
  #[serde(skip_serializing)]
  pub user:  Id,
  pub title: String,
  pub tag:   Vec<Attribute>,
  pub task:  Vec<Attribute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBusiness {
  pub title: String,
  #[serde(default)]
  pub tag:   BTreeSet<Id>,
  #[serde(default)]
  pub task:  BTreeSet<Id>,
}

impl NewBusiness {
  pub fn validated(mut self) -> Result<Self> {
    self.title = non_blank("title", &self.title)?.to_owned();
    Ok(self)
  }

  pub fn related(&self, relation: Relation) -> &BTreeSet<Id> {
    match relation {
      Relation::Tag => &self.tag,
      Relation::Task => &self.task,
    }
  }
}

/// Changes to a business. A present `tag`/`task` set replaces the existing
/// membership wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusinessUpdate {
  pub title: Option<String>,
  pub tag:   Option<BTreeSet<Id>>,
  pub task:  Option<BTreeSet<Id>>,
}

impl BusinessUpdate {
  pub fn validated(mut self) -> Result<Self> {
    if let Some(title) = &self.title {
      self.title = Some(non_blank("title", title)?.to_owned());
    }
    Ok(self)
  }

  pub fn related(&self, relation: Relation) -> Option<&BTreeSet<Id>> {
    match relation {
      Relation::Tag => self.tag.as_ref(),
      Relation::Task => self.task.as_ref(),
    }
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Trim `value`, rejecting it if nothing is left.
pub fn non_blank<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    return Err(Error::Blank { field });
  }
  Ok(trimmed)
}
