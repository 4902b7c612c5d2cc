//! SQL schema for the Bizhub SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    email      TEXT    NOT NULL UNIQUE,   -- stored lower-cased
    name       TEXT    NOT NULL,
    is_active  INTEGER NOT NULL DEFAULT 1,
    is_staff   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role    TEXT    NOT NULL,
    PRIMARY KEY (user_id, role)
);

-- Only the SHA-256 digest of a token is kept.
CREATE TABLE IF NOT EXISTS tokens (
    digest     TEXT    PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS feed_items (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_profile INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    status_text  TEXT    NOT NULL,
    created_on   TEXT    NOT NULL   -- RFC 3339 UTC
);

-- user_id is written once on insert and never updated.
CREATE TABLE IF NOT EXISTS tags (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name    TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name    TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS businesses (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title   TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS business_tags (
    business_id INTEGER NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    tag_id      INTEGER NOT NULL REFERENCES tags(id)       ON DELETE CASCADE,
    PRIMARY KEY (business_id, tag_id)
);

CREATE TABLE IF NOT EXISTS business_tasks (
    business_id INTEGER NOT NULL REFERENCES businesses(id) ON DELETE CASCADE,
    task_id     INTEGER NOT NULL REFERENCES tasks(id)      ON DELETE CASCADE,
    PRIMARY KEY (business_id, task_id)
);

CREATE INDEX IF NOT EXISTS tags_user_idx          ON tags(user_id);
CREATE INDEX IF NOT EXISTS tasks_user_idx         ON tasks(user_id);
CREATE INDEX IF NOT EXISTS businesses_user_idx    ON businesses(user_id);
CREATE INDEX IF NOT EXISTS feed_items_profile_idx ON feed_items(user_profile);
CREATE INDEX IF NOT EXISTS business_tags_tag_idx  ON business_tags(tag_id);
CREATE INDEX IF NOT EXISTS business_tasks_task_idx ON business_tasks(task_id);

PRAGMA user_version = 1;
";
