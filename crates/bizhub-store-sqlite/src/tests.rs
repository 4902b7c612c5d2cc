//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeSet;

use bizhub_core::{
  Id,
  filter::{Collection, CollectionFilter, ListParams, Predicate},
  principal::Principal,
  record::{BusinessUpdate, NewBusiness, NewUser, ProfileUpdate, Relation, UserProfile},
  Error as CoreError,
  store::{RecordStore, StoreError as _},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, email: &str) -> UserProfile {
  s.create_user(NewUser { email: email.into(), name: "user".into(), is_staff: false })
    .await
    .unwrap()
}

fn predicate(collection: Collection, owner: Id, params: ListParams) -> Predicate {
  CollectionFilter::for_collection(collection)
    .build(&Principal::authenticated(owner, [] as [&str; 0]), &params)
    .unwrap()
}

fn new_business(title: &str, tag: &[Id], task: &[Id]) -> NewBusiness {
  NewBusiness {
    title: title.into(),
    tag:   tag.iter().copied().collect(),
    task:  task.iter().copied().collect(),
  }
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_user_normalizes_email() {
  let s = store().await;
  let u = user(&s, "User@Email.COM").await;
  assert_eq!(u.email, "user@email.com");
  assert!(u.is_active);

  let found = s.find_user_by_email("USER@email.com".into()).await.unwrap();
  assert_eq!(found.map(|f| f.id), Some(u.id));
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  user(&s, "user@email.com").await;
  let err = s
    .create_user(NewUser { email: "USER@email.com".into(), name: "x".into(), is_staff: false })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::DuplicateEmail(_))));
}

#[tokio::test]
async fn search_users_by_name_or_email() {
  let s = store().await;
  s.create_user(NewUser { email: "alice@email.com".into(), name: "Alice".into(), is_staff: false })
    .await
    .unwrap();
  s.create_user(NewUser { email: "bob@email.com".into(), name: "Bob".into(), is_staff: false })
    .await
    .unwrap();

  assert_eq!(s.list_users(None).await.unwrap().len(), 2);
  let hits = s.list_users(Some("ALI")).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].name, "Alice");
  assert_eq!(s.list_users(Some("bob@")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
  let s = store().await;
  user(&s, "alice@email.com").await;
  let underscored = user(&s, "first_last@email.com").await;

  assert!(s.list_users(Some("%")).await.unwrap().is_empty());
  let hits = s.list_users(Some("_")).await.unwrap();
  assert_eq!(hits.iter().map(|u| u.id).collect::<Vec<_>>(), vec![underscored.id]);
  assert!(s.list_users(Some(r"\")).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_user_keeps_unset_fields() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  let updated = s
    .update_user(u.id, ProfileUpdate { email: None, name: Some("New Name".into()) })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.name, "New Name");
  assert_eq!(updated.email, "user@email.com");

  assert!(s.update_user(999, ProfileUpdate::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_user_rejects_taken_email() {
  let s = store().await;
  let a = user(&s, "a@email.com").await;
  user(&s, "b@email.com").await;
  let err = s
    .update_user(a.id, ProfileUpdate { email: Some("B@email.com".into()), name: None })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::DuplicateEmail(_))));
}

#[tokio::test]
async fn delete_user_cascades() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  s.create_attribute(Relation::Tag, u.id, "Sales".into()).await.unwrap();
  s.store_token(u.id, "digest".into()).await.unwrap();

  assert!(s.delete_user(u.id).await.unwrap());
  assert!(!s.delete_user(u.id).await.unwrap());
  assert!(s.principal_for_token("digest".into()).await.unwrap().is_none());
  let tags = s
    .list_attributes(&predicate(Collection::Tags, u.id, ListParams::default()))
    .await
    .unwrap();
  assert!(tags.is_empty());
}

// ─── Tokens and roles ────────────────────────────────────────────────────────

#[tokio::test]
async fn token_resolves_to_principal_with_roles() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  s.grant_role(u.id, "Sales".into()).await.unwrap();
  s.grant_role(u.id, "Sales".into()).await.unwrap();
  s.store_token(u.id, "abc123".into()).await.unwrap();

  let principal = s.principal_for_token("abc123".into()).await.unwrap().unwrap();
  assert_eq!(principal.id(), Some(u.id));
  assert!(principal.has_role("Sales"));
  assert_eq!(principal.roles().len(), 1);

  assert!(s.principal_for_token("nope".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn grant_role_to_missing_user_fails() {
  let s = store().await;
  let err = s.grant_role(42, "Sales".into()).await.unwrap_err();
  assert!(matches!(err, Error::UserNotFound(42)));
}

// ─── Feed items ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn feed_item_lifecycle() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  let item = s.create_feed_item(u.id, "hello".into()).await.unwrap();
  assert_eq!(item.user_profile, u.id);

  let fetched = s.get_feed_item(item.id).await.unwrap().unwrap();
  assert_eq!(fetched.status_text, "hello");

  let updated = s.update_feed_item(item.id, "bye".into()).await.unwrap().unwrap();
  assert_eq!(updated.status_text, "bye");
  assert_eq!(updated.user_profile, u.id);

  s.create_feed_item(u.id, "second".into()).await.unwrap();
  let all = s.list_feed_items().await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].status_text, "second");

  assert!(s.delete_feed_item(item.id).await.unwrap());
  assert!(s.get_feed_item(item.id).await.unwrap().is_none());
  assert!(s.update_feed_item(item.id, "x".into()).await.unwrap().is_none());
}

// ─── Tags and tasks ──────────────────────────────────────────────────────────

#[tokio::test]
async fn blank_attribute_name_is_rejected() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  let err = s.create_attribute(Relation::Tag, u.id, "  ".into()).await.unwrap_err();
  assert!(matches!(err, Error::Core(bizhub_core::Error::Blank { field: "name" })));
}

#[tokio::test]
async fn tags_limited_to_owner() {
  let s = store().await;
  let a = user(&s, "a@email.com").await;
  let b = user(&s, "b@email.com").await;
  s.create_attribute(Relation::Tag, b.id, "Warehouse".into()).await.unwrap();
  let mine = s.create_attribute(Relation::Tag, a.id, "sales team".into()).await.unwrap();

  let tags = s
    .list_attributes(&predicate(Collection::Tags, a.id, ListParams::default()))
    .await
    .unwrap();
  assert_eq!(tags, vec![mine]);
}

#[tokio::test]
async fn tags_ordered_by_name_descending() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  for name in ["Manufacturing", "Sales", "Accounting"] {
    s.create_attribute(Relation::Tag, u.id, name.into()).await.unwrap();
  }
  let names: Vec<String> = s
    .list_attributes(&predicate(Collection::Tags, u.id, ListParams::default()))
    .await
    .unwrap()
    .into_iter()
    .map(|t| t.name)
    .collect();
  assert_eq!(names, ["Sales", "Manufacturing", "Accounting"]);
}

#[tokio::test]
async fn assigned_only_excludes_unattached_tags() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  let t1 = s.create_attribute(Relation::Tag, u.id, "sales team".into()).await.unwrap();
  s.create_attribute(Relation::Tag, u.id, "order management".into()).await.unwrap();
  s.create_business(u.id, new_business("Biz1", &[t1.id], &[])).await.unwrap();

  let params = ListParams { assigned_only: Some("1".into()), ..Default::default() };
  let tags = s
    .list_attributes(&predicate(Collection::Tags, u.id, params))
    .await
    .unwrap();
  assert_eq!(tags, vec![t1]);
}

#[tokio::test]
async fn assigned_only_returns_shared_task_once() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  let t1 = s.create_attribute(Relation::Task, u.id, "finding customers".into()).await.unwrap();
  s.create_attribute(Relation::Task, u.id, "collecting feedback".into()).await.unwrap();
  s.create_business(u.id, new_business("Biz1", &[], &[t1.id])).await.unwrap();
  s.create_business(u.id, new_business("Biz2", &[], &[t1.id])).await.unwrap();

  let params = ListParams { assigned_only: Some("1".into()), ..Default::default() };
  let tasks = s
    .list_attributes(&predicate(Collection::Tasks, u.id, params))
    .await
    .unwrap();
  assert_eq!(tasks.len(), 1);
  assert_eq!(tasks[0].id, t1.id);
}

#[tokio::test]
async fn tags_and_tasks_are_separate_tables() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  s.create_attribute(Relation::Tag, u.id, "tag".into()).await.unwrap();
  let tasks = s
    .list_attributes(&predicate(Collection::Tasks, u.id, ListParams::default()))
    .await
    .unwrap();
  assert!(tasks.is_empty());
}

#[tokio::test]
async fn wrong_collection_predicate_is_rejected() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  let p = predicate(Collection::Businesses, u.id, ListParams::default());
  assert!(matches!(s.list_attributes(&p).await, Err(Error::WrongCollection(_))));
  let p = predicate(Collection::Tags, u.id, ListParams::default());
  assert!(matches!(s.list_businesses(&p).await, Err(Error::WrongCollection(_))));
}

// ─── Businesses ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_business_with_tags_and_tasks() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  let tag1 = s.create_attribute(Relation::Tag, u.id, "sales team".into()).await.unwrap();
  let tag2 = s.create_attribute(Relation::Tag, u.id, "order management team".into()).await.unwrap();
  let task = s.create_attribute(Relation::Task, u.id, "finding new customers".into()).await.unwrap();

  let created = s
    .create_business(u.id, new_business("sales", &[tag1.id, tag2.id], &[task.id]))
    .await
    .unwrap();
  let fetched = s.get_business(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
  assert_eq!(fetched.tag, BTreeSet::from([tag1.id, tag2.id]));

  let detail = s.get_business_detail(created.id).await.unwrap().unwrap();
  assert_eq!(detail.title, "sales");
  assert_eq!(detail.tag, vec![tag2, tag1]);
  assert_eq!(detail.task, vec![task]);
}

#[tokio::test]
async fn create_business_with_foreign_tag_fails() {
  let s = store().await;
  let a = user(&s, "a@email.com").await;
  let b = user(&s, "b@email.com").await;
  let theirs = s.create_attribute(Relation::Tag, b.id, "Warehouse".into()).await.unwrap();

  let err = s
    .create_business(a.id, new_business("sales", &[theirs.id], &[]))
    .await
    .unwrap_err();
  assert!(matches!(
    err.as_domain(),
    Some(CoreError::UnknownRelated { relation: Relation::Tag, id }) if *id == theirs.id
  ));

  // Nothing was written.
  let listed = s
    .list_businesses(&predicate(Collection::Businesses, a.id, ListParams::default()))
    .await
    .unwrap();
  assert!(listed.is_empty());

  // The owner may link it.
  s.create_business(b.id, new_business("warehouse", &[theirs.id], &[]))
    .await
    .unwrap();
}

#[tokio::test]
async fn businesses_limited_to_owner_newest_first() {
  let s = store().await;
  let a = user(&s, "a@email.com").await;
  let b = user(&s, "b@email.com").await;
  let first = s.create_business(a.id, new_business("one", &[], &[])).await.unwrap();
  s.create_business(b.id, new_business("theirs", &[], &[])).await.unwrap();
  let second = s.create_business(a.id, new_business("two", &[], &[])).await.unwrap();

  let ids: Vec<Id> = s
    .list_businesses(&predicate(Collection::Businesses, a.id, ListParams::default()))
    .await
    .unwrap()
    .into_iter()
    .map(|b| b.id)
    .collect();
  assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn filter_businesses_by_tag_ids() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  let t1 = s.create_attribute(Relation::Tag, u.id, "one".into()).await.unwrap();
  let t2 = s.create_attribute(Relation::Tag, u.id, "two".into()).await.unwrap();
  let t3 = s.create_attribute(Relation::Tag, u.id, "three".into()).await.unwrap();
  let b1 = s.create_business(u.id, new_business("b1", &[t1.id], &[])).await.unwrap();
  s.create_business(u.id, new_business("b2", &[t3.id], &[])).await.unwrap();
  let b3 = s.create_business(u.id, new_business("b3", &[t1.id, t2.id], &[])).await.unwrap();

  let params = ListParams { tag: Some(format!("{},{}", t1.id, t2.id)), ..Default::default() };
  let ids: Vec<Id> = s
    .list_businesses(&predicate(Collection::Businesses, u.id, params))
    .await
    .unwrap()
    .into_iter()
    .map(|b| b.id)
    .collect();
  assert_eq!(ids, vec![b3.id, b1.id]);
}

#[tokio::test]
async fn order_businesses_by_title() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  s.create_business(u.id, new_business("b", &[], &[])).await.unwrap();
  s.create_business(u.id, new_business("a", &[], &[])).await.unwrap();
  s.create_business(u.id, new_business("c", &[], &[])).await.unwrap();

  let params = ListParams { ordering: Some("title".into()), ..Default::default() };
  let titles: Vec<String> = s
    .list_businesses(&predicate(Collection::Businesses, u.id, params))
    .await
    .unwrap()
    .into_iter()
    .map(|b| b.title)
    .collect();
  assert_eq!(titles, ["a", "b", "c"]);
}

#[tokio::test]
async fn update_business_replaces_memberships() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  let t1 = s.create_attribute(Relation::Tag, u.id, "one".into()).await.unwrap();
  let t2 = s.create_attribute(Relation::Tag, u.id, "two".into()).await.unwrap();
  let task = s.create_attribute(Relation::Task, u.id, "task".into()).await.unwrap();
  let b = s.create_business(u.id, new_business("sales", &[t1.id], &[task.id])).await.unwrap();

  let update = BusinessUpdate {
    title: Some("renamed".into()),
    tag:   Some(BTreeSet::from([t2.id])),
    task:  None,
  };
  let updated = s.update_business(b.id, update).await.unwrap().unwrap();
  assert_eq!(updated.title, "renamed");
  assert_eq!(updated.user, u.id);
  assert_eq!(updated.tag, BTreeSet::from([t2.id]));
  assert_eq!(updated.task, BTreeSet::from([task.id]));

  assert!(s.update_business(999, BusinessUpdate::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_business_rejects_foreign_task() {
  let s = store().await;
  let a = user(&s, "a@email.com").await;
  let b = user(&s, "b@email.com").await;
  let theirs = s.create_attribute(Relation::Task, b.id, "theirs".into()).await.unwrap();
  let biz = s.create_business(a.id, new_business("sales", &[], &[])).await.unwrap();

  let update = BusinessUpdate { task: Some(BTreeSet::from([theirs.id])), ..Default::default() };
  let err = s.update_business(biz.id, update).await.unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::UnknownRelated { relation: Relation::Task, .. })));
}

#[tokio::test]
async fn delete_business_removes_memberships() {
  let s = store().await;
  let u = user(&s, "user@email.com").await;
  let t1 = s.create_attribute(Relation::Tag, u.id, "one".into()).await.unwrap();
  let b = s.create_business(u.id, new_business("sales", &[t1.id], &[])).await.unwrap();

  assert!(s.delete_business(b.id).await.unwrap());
  assert!(s.get_business(b.id).await.unwrap().is_none());

  let params = ListParams { assigned_only: Some("1".into()), ..Default::default() };
  let tags = s
    .list_attributes(&predicate(Collection::Tags, u.id, params))
    .await
    .unwrap();
  assert!(tags.is_empty());
}
