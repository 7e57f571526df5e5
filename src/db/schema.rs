//! Database schema and migrations.
//!
//! Migrations are applied in order when the database is opened.

/// Database migrations.
///
/// Each migration is a SQL script executed in its own transaction.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Feed sources with liveness state
    r#"
CREATE TABLE feeds (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    url             TEXT NOT NULL UNIQUE,
    name            TEXT NOT NULL,
    icon_url        TEXT,
    is_active       INTEGER NOT NULL DEFAULT 1,
    last_fetched_at TEXT,                       -- NULL until the first attempt
    error_count     INTEGER NOT NULL DEFAULT 0, -- consecutive transient failures
    last_error      TEXT,
    created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX idx_feeds_schedule ON feeds(is_active, last_fetched_at);
"#,
    // v2: Ingested items, deduplicated globally by url
    r#"
CREATE TABLE items (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    feed_id      INTEGER NOT NULL,              -- no cascade: items outlive their feed
    title        TEXT NOT NULL,
    url          TEXT NOT NULL UNIQUE,
    published_at TEXT NOT NULL,
    summary      TEXT,
    image_url    TEXT,
    created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX idx_items_published_at ON items(published_at);
CREATE INDEX idx_items_feed_id ON items(feed_id);
"#,
    // v3: Append-only log of terminal feed failures
    r#"
CREATE TABLE feed_errors (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    feed_id       INTEGER NOT NULL,
    feed_name     TEXT NOT NULL,
    feed_url      TEXT NOT NULL,
    error_code    TEXT NOT NULL CHECK (error_code IN ('NO_ITEMS', 'STALE', 'FATAL')),
    error_message TEXT NOT NULL,
    created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX idx_feed_errors_feed_id ON feed_errors(feed_id);
"#,
];
