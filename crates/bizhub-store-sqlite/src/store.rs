//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`].

use std::{collections::BTreeSet, path::Path};

use bizhub_core::{
  Error as CoreError, Id,
  filter::Predicate,
  principal::Principal,
  record::{
    Attribute, Business, BusinessDetail, BusinessUpdate, FeedItem, NewBusiness,
    NewUser, ProfileUpdate, Relation, UserProfile,
  },
  store::RecordStore,
};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, types::Value};

use crate::{
  Error, Result,
  encode::{
    RawFeedItem, attribute_from_row, attribute_table, business_from_row, contains_pattern,
    encode_dt, join_column, join_table, order_by,
  },
  schema::SCHEMA,
};

const USER_COLUMNS: &str = "id, email, name, is_active, is_staff";
const FEED_COLUMNS: &str = "id, user_profile, status_text, created_on";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Bizhub record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Synchronous helpers (run inside `Connection::call`) ─────────────────────

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
  Ok(UserProfile {
    id:        row.get(0)?,
    email:     row.get(1)?,
    name:      row.get(2)?,
    is_active: row.get(3)?,
    is_staff:  row.get(4)?,
    roles:     BTreeSet::new(),
  })
}

fn load_roles(conn: &Connection, user_id: Id) -> rusqlite::Result<BTreeSet<String>> {
  let mut stmt = conn.prepare("SELECT role FROM user_roles WHERE user_id = ?1")?;
  let roles = stmt
    .query_map(rusqlite::params![user_id], |row| row.get(0))?
    .collect::<rusqlite::Result<BTreeSet<String>>>()?;
  Ok(roles)
}

fn with_roles(conn: &Connection, mut user: UserProfile) -> rusqlite::Result<UserProfile> {
  user.roles = load_roles(conn, user.id)?;
  Ok(user)
}

fn load_user(conn: &Connection, id: Id) -> rusqlite::Result<Option<UserProfile>> {
  let user = conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
      rusqlite::params![id],
      user_from_row,
    )
    .optional()?;
  user.map(|u| with_roles(conn, u)).transpose()
}

fn email_taken(conn: &Connection, email: &str, except: Option<Id>) -> rusqlite::Result<bool> {
  conn
    .prepare("SELECT 1 FROM users WHERE email = ?1 AND id != ?2")?
    .exists(rusqlite::params![email, except.unwrap_or(0)])
}

fn first_foreign(
  conn: &Connection,
  relation: Relation,
  owner: Id,
  ids: &BTreeSet<Id>,
) -> rusqlite::Result<Option<Id>> {
  let sql = format!(
    "SELECT 1 FROM {} WHERE id = ?1 AND user_id = ?2",
    attribute_table(relation)
  );
  let mut stmt = conn.prepare(&sql)?;
  for &id in ids {
    if !stmt.exists(rusqlite::params![id, owner])? {
      return Ok(Some(id));
    }
  }
  Ok(None)
}

fn memberships(conn: &Connection, relation: Relation, business_id: Id) -> rusqlite::Result<BTreeSet<Id>> {
  let sql = format!(
    "SELECT {} FROM {} WHERE business_id = ?1",
    join_column(relation),
    join_table(relation)
  );
  let mut stmt = conn.prepare(&sql)?;
  let ids = stmt
    .query_map(rusqlite::params![business_id], |row| row.get(0))?
    .collect::<rusqlite::Result<BTreeSet<Id>>>()?;
  Ok(ids)
}

fn with_memberships(conn: &Connection, mut business: Business) -> rusqlite::Result<Business> {
  business.tag = memberships(conn, Relation::Tag, business.id)?;
  business.task = memberships(conn, Relation::Task, business.id)?;
  Ok(business)
}

fn replace_memberships(
  conn: &Connection,
  relation: Relation,
  business_id: Id,
  ids: &BTreeSet<Id>,
) -> rusqlite::Result<()> {
  let table = join_table(relation);
  let column = join_column(relation);
  conn.execute(
    &format!("DELETE FROM {table} WHERE business_id = ?1"),
    rusqlite::params![business_id],
  )?;
  let mut insert = conn.prepare(&format!(
    "INSERT INTO {table} (business_id, {column}) VALUES (?1, ?2)"
  ))?;
  for &id in ids {
    insert.execute(rusqlite::params![business_id, id])?;
  }
  Ok(())
}

fn load_business(conn: &Connection, id: Id) -> rusqlite::Result<Option<Business>> {
  let business = conn
    .query_row(
      "SELECT id, user_id, title FROM businesses WHERE id = ?1",
      rusqlite::params![id],
      business_from_row,
    )
    .optional()?;
  business.map(|b| with_memberships(conn, b)).transpose()
}

/// Attributes linked to a business, by name.
fn linked_attributes(
  conn: &Connection,
  relation: Relation,
  business_id: Id,
) -> rusqlite::Result<Vec<Attribute>> {
  let sql = format!(
    "SELECT a.id, a.user_id, a.name
     FROM {table} a
     JOIN {join} m ON m.{column} = a.id
     WHERE m.business_id = ?1
     ORDER BY a.name, a.id",
    table = attribute_table(relation),
    join = join_table(relation),
    column = join_column(relation),
  );
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(rusqlite::params![business_id], attribute_from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<UserProfile> {
    let input = input.normalized()?;
    let email = input.email.clone();

    let created: Option<UserProfile> = self
      .conn
      .call(move |conn| {
        if email_taken(conn, &input.email, None)? {
          return Ok(None);
        }
        conn.execute(
          "INSERT INTO users (email, name, is_active, is_staff) VALUES (?1, ?2, 1, ?3)",
          rusqlite::params![input.email, input.name, input.is_staff],
        )?;
        Ok(Some(UserProfile {
          id:        conn.last_insert_rowid(),
          email:     input.email,
          name:      input.name,
          is_active: true,
          is_staff:  input.is_staff,
          roles:     BTreeSet::new(),
        }))
      })
      .await?;

    created.ok_or(Error::Core(CoreError::DuplicateEmail(email)))
  }

  async fn get_user(&self, id: Id) -> Result<Option<UserProfile>> {
    Ok(self.conn.call(move |conn| Ok(load_user(conn, id)?)).await?)
  }

  async fn find_user_by_email(&self, email: String) -> Result<Option<UserProfile>> {
    let email = email.trim().to_lowercase();
    let user = self
      .conn
      .call(move |conn| {
        let user = conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            rusqlite::params![email],
            user_from_row,
          )
          .optional()?;
        Ok(user.map(|u| with_roles(conn, u)).transpose()?)
      })
      .await?;
    Ok(user)
  }

  async fn list_users(&self, search: Option<&str>) -> Result<Vec<UserProfile>> {
    let pattern = search.map(|s| contains_pattern(&s.trim().to_lowercase()));

    let users = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users
           WHERE ?1 IS NULL
              OR lower(name) LIKE ?1 ESCAPE '\\'
              OR lower(email) LIKE ?1 ESCAPE '\\'
           ORDER BY id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern], user_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let users = rows
          .into_iter()
          .map(|u| with_roles(conn, u))
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
      })
      .await?;
    Ok(users)
  }

  async fn update_user(&self, id: Id, update: ProfileUpdate) -> Result<Option<UserProfile>> {
    let update = update.validated()?;

    // Outer `None`: no such profile. Inner `Err`: the new email is taken.
    let outcome: Option<std::result::Result<UserProfile, String>> = self
      .conn
      .call(move |conn| {
        if load_user(conn, id)?.is_none() {
          return Ok(None);
        }
        if let Some(email) = &update.email
          && email_taken(conn, email, Some(id))?
        {
          return Ok(Some(Err(email.clone())));
        }
        conn.execute(
          "UPDATE users SET email = COALESCE(?2, email), name = COALESCE(?3, name)
           WHERE id = ?1",
          rusqlite::params![id, update.email, update.name],
        )?;
        Ok(load_user(conn, id)?.map(Ok))
      })
      .await?;

    outcome
      .transpose()
      .map_err(|email| Error::Core(CoreError::DuplicateEmail(email)))
  }

  async fn delete_user(&self, id: Id) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn grant_role(&self, user_id: Id, role: String) -> Result<()> {
    let found = self
      .conn
      .call(move |conn| {
        if load_user(conn, user_id)?.is_none() {
          return Ok(false);
        }
        conn.execute(
          "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)",
          rusqlite::params![user_id, role],
        )?;
        Ok(true)
      })
      .await?;

    if found { Ok(()) } else { Err(Error::UserNotFound(user_id)) }
  }

  // ── Tokens ────────────────────────────────────────────────────────────────

  async fn store_token(&self, user_id: Id, digest: String) -> Result<()> {
    let at_str = encode_dt(Utc::now());
    let found = self
      .conn
      .call(move |conn| {
        if load_user(conn, user_id)?.is_none() {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO tokens (digest, user_id, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![digest, user_id, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if found { Ok(()) } else { Err(Error::UserNotFound(user_id)) }
  }

  async fn principal_for_token(&self, digest: String) -> Result<Option<Principal>> {
    let principal = self
      .conn
      .call(move |conn| {
        let user_id: Option<Id> = conn
          .query_row(
            "SELECT u.id FROM tokens t
             JOIN users u ON u.id = t.user_id
             WHERE t.digest = ?1 AND u.is_active = 1",
            rusqlite::params![digest],
            |row| row.get(0),
          )
          .optional()?;
        let Some(user_id) = user_id else { return Ok(None) };
        let roles = load_roles(conn, user_id)?;
        Ok(Some(Principal::authenticated(user_id, roles)))
      })
      .await?;
    Ok(principal)
  }

  // ── Feed items ────────────────────────────────────────────────────────────

  async fn create_feed_item(&self, user_profile: Id, status_text: String) -> Result<FeedItem> {
    let created_on = Utc::now();
    let at_str = encode_dt(created_on);
    let text = status_text.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO feed_items (user_profile, status_text, created_on) VALUES (?1, ?2, ?3)",
          rusqlite::params![user_profile, text, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(FeedItem { id, user_profile, status_text, created_on })
  }

  async fn get_feed_item(&self, id: Id) -> Result<Option<FeedItem>> {
    let raw: Option<RawFeedItem> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {FEED_COLUMNS} FROM feed_items WHERE id = ?1"),
            rusqlite::params![id],
            RawFeedItem::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawFeedItem::into_item).transpose()
  }

  async fn list_feed_items(&self) -> Result<Vec<FeedItem>> {
    let raws: Vec<RawFeedItem> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FEED_COLUMNS} FROM feed_items ORDER BY created_on DESC, id DESC"
        ))?;
        let rows = stmt
          .query_map([], RawFeedItem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFeedItem::into_item).collect()
  }

  async fn update_feed_item(&self, id: Id, status_text: String) -> Result<Option<FeedItem>> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE feed_items SET status_text = ?2 WHERE id = ?1",
          rusqlite::params![id, status_text],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_feed_item(id).await
  }

  async fn delete_feed_item(&self, id: Id) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM feed_items WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Tags and tasks ────────────────────────────────────────────────────────

  async fn create_attribute(&self, relation: Relation, owner: Id, name: String) -> Result<Attribute> {
    let name = bizhub_core::record::non_blank("name", &name)?.to_owned();
    let table = attribute_table(relation);
    let stored = name.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("INSERT INTO {table} (user_id, name) VALUES (?1, ?2)"),
          rusqlite::params![owner, stored],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Attribute { id, user: owner, name })
  }

  async fn list_attributes(&self, predicate: &Predicate) -> Result<Vec<Attribute>> {
    let relation = predicate
      .collection()
      .attribute_relation()
      .ok_or(Error::WrongCollection(predicate.collection()))?;

    let mut sql = format!(
      "SELECT a.id, a.user_id, a.name FROM {} a WHERE a.user_id = ?1",
      attribute_table(relation)
    );
    if predicate.assigned_only() {
      // EXISTS yields each attribute once however many businesses hold it.
      sql.push_str(&format!(
        " AND EXISTS (SELECT 1 FROM {} m WHERE m.{} = a.id)",
        join_table(relation),
        join_column(relation)
      ));
    }
    sql.push_str(&order_by("a", predicate.order()));
    let owner = predicate.owner();

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![owner], attribute_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  // ── Businesses ────────────────────────────────────────────────────────────

  async fn create_business(&self, owner: Id, input: NewBusiness) -> Result<Business> {
    let input = input.validated()?;

    let outcome: std::result::Result<Id, (Relation, Id)> = {
      let input = input.clone();
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          for relation in Relation::ALL {
            if let Some(id) = first_foreign(&tx, relation, owner, input.related(relation))? {
              return Ok(Err((relation, id)));
            }
          }
          tx.execute(
            "INSERT INTO businesses (user_id, title) VALUES (?1, ?2)",
            rusqlite::params![owner, input.title],
          )?;
          let id = tx.last_insert_rowid();
          for relation in Relation::ALL {
            replace_memberships(&tx, relation, id, input.related(relation))?;
          }
          tx.commit()?;
          Ok(Ok(id))
        })
        .await?
    };

    let id = outcome.map_err(|(relation, id)| CoreError::UnknownRelated { relation, id })?;
    Ok(Business {
      id,
      user: owner,
      title: input.title,
      tag: input.tag,
      task: input.task,
    })
  }

  async fn get_business(&self, id: Id) -> Result<Option<Business>> {
    Ok(self.conn.call(move |conn| Ok(load_business(conn, id)?)).await?)
  }

  async fn get_business_detail(&self, id: Id) -> Result<Option<BusinessDetail>> {
    let detail = self
      .conn
      .call(move |conn| {
        let Some(business) = load_business(conn, id)? else { return Ok(None) };
        Ok(Some(BusinessDetail {
          id:    business.id,
          user:  business.user,
          title: business.title,
          tag:   linked_attributes(conn, Relation::Tag, id)?,
          task:  linked_attributes(conn, Relation::Task, id)?,
        }))
      })
      .await?;
    Ok(detail)
  }

  async fn update_business(&self, id: Id, update: BusinessUpdate) -> Result<Option<Business>> {
    let update = update.validated()?;

    let outcome: Option<std::result::Result<Business, (Relation, Id)>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(current) = load_business(&tx, id)? else { return Ok(None) };
        for relation in Relation::ALL {
          if let Some(ids) = update.related(relation)
            && let Some(foreign) = first_foreign(&tx, relation, current.user, ids)?
          {
            return Ok(Some(Err((relation, foreign))));
          }
        }
        if let Some(title) = &update.title {
          tx.execute(
            "UPDATE businesses SET title = ?2 WHERE id = ?1",
            rusqlite::params![id, title],
          )?;
        }
        for relation in Relation::ALL {
          if let Some(ids) = update.related(relation) {
            replace_memberships(&tx, relation, id, ids)?;
          }
        }
        let updated = load_business(&tx, id)?;
        tx.commit()?;
        Ok(updated.map(Ok))
      })
      .await?;

    outcome
      .transpose()
      .map_err(|(relation, id)| Error::Core(CoreError::UnknownRelated { relation, id }))
  }

  async fn delete_business(&self, id: Id) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM businesses WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn list_businesses(&self, predicate: &Predicate) -> Result<Vec<Business>> {
    if predicate.collection().attribute_relation().is_some() {
      return Err(Error::WrongCollection(predicate.collection()));
    }

    let mut sql = String::from("SELECT b.id, b.user_id, b.title FROM businesses b WHERE b.user_id = ?");
    let mut values = vec![Value::Integer(predicate.owner())];
    for clause in predicate.memberships() {
      let placeholders = vec!["?"; clause.ids.len()].join(", ");
      sql.push_str(&format!(
        " AND EXISTS (SELECT 1 FROM {} m WHERE m.business_id = b.id AND m.{} IN ({placeholders}))",
        join_table(clause.relation),
        join_column(clause.relation),
      ));
      values.extend(clause.ids.iter().map(|&id| Value::Integer(id)));
    }
    sql.push_str(&order_by("b", predicate.order()));

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(values), business_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let rows = rows
          .into_iter()
          .map(|b| with_memberships(conn, b))
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}
