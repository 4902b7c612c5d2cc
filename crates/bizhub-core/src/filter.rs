//! Owner-scoped collection queries.
//!
//! [`CollectionFilter::build`] turns a principal and the caller's query
//! parameters into a [`Predicate`]. The predicate is a description only:
//! storage backends translate it into their own query language, and
//! [`Predicate::select`] evaluates it in memory over [`Candidate`] rows.
//!
//! The owner clause is not optional. A [`Predicate`] can only be obtained
//! from [`CollectionFilter::build`], and every build path sets it from the
//! principal, so no query parameter can widen a listing to another user's
//! records.

use std::{
  cmp::Ordering,
  collections::{BTreeMap, BTreeSet},
};

use serde::Deserialize;

use crate::{
  Error, Id, Result,
  principal::Principal,
  record::{Business, Relation},
};

// ─── Collections and ordering ────────────────────────────────────────────────

/// The owner-scoped collections that can be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
  Tags,
  Tasks,
  Businesses,
}

impl Collection {
  /// For an attribute collection, the relation linking it to businesses.
  pub fn attribute_relation(self) -> Option<Relation> {
    match self {
      Self::Tags => Some(Relation::Tag),
      Self::Tasks => Some(Relation::Task),
      Self::Businesses => None,
    }
  }

  /// Tags and tasks list by name, businesses newest first.
  pub fn default_order(self) -> SortOrder {
    match self {
      Self::Tags | Self::Tasks => SortOrder { field: SortField::Name, descending: true },
      Self::Businesses => SortOrder { field: SortField::Id, descending: true },
    }
  }

  fn sort_field(self, name: &str) -> Option<SortField> {
    match (self, name) {
      (_, "id") => Some(SortField::Id),
      (Self::Tags | Self::Tasks, "name") => Some(SortField::Name),
      (Self::Businesses, "title") => Some(SortField::Title),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
  Id,
  Name,
  Title,
}

impl SortField {
  pub fn column(self) -> &'static str {
    match self {
      Self::Id => "id",
      Self::Name => "name",
      Self::Title => "title",
    }
  }
}

/// A total order: `field` first, then id in the same direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortOrder {
  pub field:      SortField,
  pub descending: bool,
}

impl SortOrder {
  /// Parse `field` or `-field` for `collection`.
  pub fn parse(collection: Collection, raw: &str) -> Result<Self> {
    let trimmed = raw.trim();
    let (name, descending) = match trimmed.strip_prefix('-') {
      Some(rest) => (rest, true),
      None => (trimmed, false),
    };
    let field = collection
      .sort_field(name)
      .ok_or_else(|| Error::invalid_filter("ordering", raw))?;
    Ok(Self { field, descending })
  }

  fn compare(self, a: &Candidate, b: &Candidate) -> Ordering {
    let primary = match self.field {
      SortField::Id => Ordering::Equal,
      SortField::Name | SortField::Title => a.sort_text.cmp(&b.sort_text),
    };
    let ord = primary.then(a.id.cmp(&b.id));
    if self.descending { ord.reverse() } else { ord }
  }
}

// ─── Query parameters ────────────────────────────────────────────────────────

/// Raw list-endpoint query parameters, as the caller sent them.
///
/// Parameters that do not apply to the collection being listed are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
  /// Comma-separated tag ids; businesses only.
  pub tag:           Option<String>,
  /// Comma-separated task ids; businesses only.
  pub task:          Option<String>,
  /// Truthy to list only tags/tasks attached to at least one business.
  pub assigned_only: Option<String>,
  /// `field` or `-field`.
  pub ordering:      Option<String>,
}

impl ListParams {
  fn ids_for(&self, relation: Relation) -> Option<&str> {
    match relation {
      Relation::Tag => self.tag.as_deref(),
      Relation::Task => self.task.as_deref(),
    }
  }
}

/// Parse a comma-separated id list. Any malformed token fails the whole list.
pub fn parse_ids(param: &str, raw: &str) -> Result<BTreeSet<Id>> {
  raw
    .split(',')
    .map(|token| {
      token
        .trim()
        .parse::<Id>()
        .map_err(|_| Error::invalid_filter(param, token))
    })
    .collect()
}

fn parse_flag(param: &str, raw: &str) -> Result<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" => Ok(false),
    _ => Err(Error::invalid_filter(param, raw)),
  }
}

// ─── Predicate ───────────────────────────────────────────────────────────────

/// Keep records whose `relation` membership intersects `ids`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipClause {
  pub relation: Relation,
  pub ids:      BTreeSet<Id>,
}

impl MembershipClause {
  pub fn matches(&self, related: &BTreeSet<Id>) -> bool {
    !related.is_disjoint(&self.ids)
  }
}

/// A declarative filter over one owner-scoped collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
  collection:    Collection,
  owner:         Id,
  memberships:   Vec<MembershipClause>,
  assigned_only: bool,
  order:         SortOrder,
}

impl Predicate {
  pub fn collection(&self) -> Collection { self.collection }

  /// The mandatory owner clause.
  pub fn owner(&self) -> Id { self.owner }

  /// Membership clauses; all must hold. Only ever set for businesses.
  pub fn memberships(&self) -> &[MembershipClause] { &self.memberships }

  /// Only ever set for tags and tasks.
  pub fn assigned_only(&self) -> bool { self.assigned_only }

  pub fn order(&self) -> SortOrder { self.order }

  pub fn matches(&self, candidate: &Candidate) -> bool {
    if candidate.owner != self.owner {
      return false;
    }
    if !self
      .memberships
      .iter()
      .all(|clause| clause.matches(candidate.related(clause.relation)))
    {
      return false;
    }
    match self.collection.attribute_relation() {
      Some(relation) if self.assigned_only => !candidate.related(relation).is_empty(),
      _ => true,
    }
  }

  /// Evaluate in memory: filter, keep each id once, then order.
  pub fn select<'a, I>(&self, candidates: I) -> Vec<Id>
  where
    I: IntoIterator<Item = &'a Candidate>,
  {
    let mut unique: BTreeMap<Id, &Candidate> = BTreeMap::new();
    for candidate in candidates {
      if self.matches(candidate) {
        unique.entry(candidate.id).or_insert(candidate);
      }
    }
    let mut rows: Vec<&Candidate> = unique.into_values().collect();
    rows.sort_by(|a, b| self.order.compare(a, b));
    rows.into_iter().map(|c| c.id).collect()
  }
}

// ─── Candidate rows ──────────────────────────────────────────────────────────

static NO_IDS: BTreeSet<Id> = BTreeSet::new();

/// The part of a record a [`Predicate`] looks at.
///
/// `related` is seen from this record's side: for a business, the ids of its
/// tags and tasks; for a tag or task, the ids of the businesses holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
  pub id:        Id,
  pub owner:     Id,
  pub sort_text: String,
  pub related:   BTreeMap<Relation, BTreeSet<Id>>,
}

impl Candidate {
  pub fn new(id: Id, owner: Id, sort_text: impl Into<String>) -> Self {
    Self { id, owner, sort_text: sort_text.into(), related: BTreeMap::new() }
  }

  pub fn with_related(
    mut self,
    relation: Relation,
    ids: impl IntoIterator<Item = Id>,
  ) -> Self {
    self.related.entry(relation).or_default().extend(ids);
    self
  }

  pub fn related(&self, relation: Relation) -> &BTreeSet<Id> {
    self.related.get(&relation).unwrap_or(&NO_IDS)
  }
}

impl From<&Business> for Candidate {
  fn from(business: &Business) -> Self {
    Candidate::new(business.id, business.user, business.title.clone())
      .with_related(Relation::Tag, business.tag.iter().copied())
      .with_related(Relation::Task, business.task.iter().copied())
  }
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Builds list predicates for one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionFilter {
  collection: Collection,
}

impl CollectionFilter {
  pub fn for_collection(collection: Collection) -> Self { Self { collection } }

  pub fn build(&self, principal: &Principal, params: &ListParams) -> Result<Predicate> {
    let owner = principal.id().ok_or(Error::Unauthenticated)?;

    let mut memberships = Vec::new();
    let mut assigned_only = false;
    match self.collection.attribute_relation() {
      None => {
        for relation in Relation::ALL {
          if let Some(raw) = params.ids_for(relation) {
            let ids = parse_ids(relation.param(), raw)?;
            memberships.push(MembershipClause { relation, ids });
          }
        }
      }
      Some(_) => {
        if let Some(raw) = params.assigned_only.as_deref() {
          assigned_only = parse_flag("assigned_only", raw)?;
        }
      }
    }

    let order = match params.ordering.as_deref() {
      Some(raw) => SortOrder::parse(self.collection, raw)?,
      None => self.collection.default_order(),
    };

    Ok(Predicate {
      collection: self.collection,
      owner,
      memberships,
      assigned_only,
      order,
    })
  }
}
