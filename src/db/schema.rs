//! Database schema and migrations for Gator.
//!
//! Migrations are applied in order when the database is first opened or upgraded.
//! The schema_version table tracks which migrations have been applied.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users, feeds and follows
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE feeds (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    url             TEXT NOT NULL UNIQUE,
    user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    last_fetched_at TEXT            -- NULL until the scraper first selects the feed
);

CREATE INDEX idx_feeds_last_fetched_at ON feeds(last_fetched_at);

CREATE TABLE feed_follows (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    feed_id     INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE(user_id, feed_id)
);
"#,
    // v2: posts
    r#"
CREATE TABLE posts (
    id           TEXT PRIMARY KEY,      -- UUID v4
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    title        TEXT,
    url          TEXT NOT NULL UNIQUE,
    description  TEXT,
    published_at TEXT,                  -- NULL when the item date could not be parsed
    feed_id      INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE
);

CREATE INDEX idx_posts_feed_id ON posts(feed_id);
CREATE INDEX idx_posts_published_at ON posts(published_at);
"#,
];
