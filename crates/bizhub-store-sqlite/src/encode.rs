//! Encoding helpers between domain types and SQLite rows and SQL fragments.
//!
//! Timestamps are stored as RFC 3339 strings. Table and column names are only
//! ever produced from the fixed strings in this module, never from caller
//! input, so they are safe to splice into SQL text.

use bizhub_core::{
  Id,
  filter::{SortField, SortOrder},
  record::{Attribute, Business, FeedItem, Relation},
};
use chrono::{DateTime, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Relation tables ─────────────────────────────────────────────────────────

/// Table holding the attribute records of `relation`.
pub fn attribute_table(relation: Relation) -> &'static str {
  match relation {
    Relation::Tag => "tags",
    Relation::Task => "tasks",
  }
}

/// Join table linking businesses to `relation`.
pub fn join_table(relation: Relation) -> &'static str {
  match relation {
    Relation::Tag => "business_tags",
    Relation::Task => "business_tasks",
  }
}

/// Column of [`join_table`] referencing the attribute side.
pub fn join_column(relation: Relation) -> &'static str {
  match relation {
    Relation::Tag => "tag_id",
    Relation::Task => "task_id",
  }
}

// ─── Ordering ────────────────────────────────────────────────────────────────

/// `ORDER BY` clause for `order` over table alias `alias`, tie-broken by id.
pub fn order_by(alias: &str, order: SortOrder) -> String {
  let dir = if order.descending { "DESC" } else { "ASC" };
  match order.field {
    SortField::Id => format!(" ORDER BY {alias}.id {dir}"),
    field => format!(" ORDER BY {alias}.{} {dir}, {alias}.id {dir}", field.column()),
  }
}

// ─── LIKE patterns ───────────────────────────────────────────────────────────

/// Escape character paired with [`contains_pattern`] via `ESCAPE '\'`.
pub const LIKE_ESCAPE: char = '\\';

/// A `LIKE` pattern matching `text` anywhere, with its own `%`, `_` and `\`
/// taken literally.
pub fn contains_pattern(text: &str) -> String {
  let mut pattern = String::with_capacity(text.len() + 2);
  pattern.push('%');
  for c in text.chars() {
    if matches!(c, '%' | '_' | LIKE_ESCAPE) {
      pattern.push(LIKE_ESCAPE);
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

pub fn attribute_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Attribute> {
  Ok(Attribute {
    id:   row.get(0)?,
    user: row.get(1)?,
    name: row.get(2)?,
  })
}

/// A business row without its memberships, which live in other tables.
pub fn business_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Business> {
  Ok(Business {
    id:    row.get(0)?,
    user:  row.get(1)?,
    title: row.get(2)?,
    tag:   Default::default(),
    task:  Default::default(),
  })
}

// ─── Raw row types (pre-decode) ──────────────────────────────────────────────

pub struct RawFeedItem {
  pub id:           Id,
  pub user_profile: Id,
  pub status_text:  String,
  pub created_on:   String,
}

impl RawFeedItem {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      user_profile: row.get(1)?,
      status_text:  row.get(2)?,
      created_on:   row.get(3)?,
    })
  }

  pub fn into_item(self) -> Result<FeedItem> {
    Ok(FeedItem {
      id:           self.id,
      user_profile: self.user_profile,
      status_text:  self.status_text,
      created_on:   decode_dt(&self.created_on)?,
    })
  }
}
