//! SQL schema for the DemoTime SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id      TEXT PRIMARY KEY,
    username     TEXT NOT NULL UNIQUE,
    display_name TEXT,
    email        TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    project_id TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    token      TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
    project_id   TEXT NOT NULL REFERENCES projects(project_id),
    key          TEXT NOT NULL,
    raw_value    TEXT NOT NULL,
    setting_type TEXT NOT NULL,   -- 'int' | 'bool' | 'string' | 'list' | 'json'
    active       INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (project_id, key)
);

CREATE TABLE IF NOT EXISTS webhooks (
    webhook_id    TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(project_id),
    target        TEXT NOT NULL,
    trigger_event TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reviews (
    review_id      TEXT PRIMARY KEY,
    project_id     TEXT NOT NULL REFERENCES projects(project_id),
    title          TEXT NOT NULL,
    description    TEXT NOT NULL,
    case_link      TEXT NOT NULL DEFAULT '',
    demo_state     TEXT NOT NULL,
    reviewer_state TEXT NOT NULL,
    is_public      INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL,
    modified_at    TEXT NOT NULL
);

-- Revisions are append-only.
CREATE TABLE IF NOT EXISTS revisions (
    revision_id TEXT PRIMARY KEY,
    review_id   TEXT NOT NULL REFERENCES reviews(review_id),
    number      INTEGER NOT NULL,
    description TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE (review_id, number)
);

CREATE TABLE IF NOT EXISTS reviewers (
    reviewer_id TEXT PRIMARY KEY,
    review_id   TEXT NOT NULL REFERENCES reviews(review_id),
    user_id     TEXT NOT NULL,
    status      TEXT NOT NULL,
    is_active   INTEGER NOT NULL DEFAULT 1,
    last_viewed TEXT,
    created_at  TEXT NOT NULL,
    modified_at TEXT NOT NULL,
    UNIQUE (review_id, user_id)
);

CREATE TABLE IF NOT EXISTS followers (
    follower_id TEXT PRIMARY KEY,
    review_id   TEXT NOT NULL REFERENCES reviews(review_id),
    user_id     TEXT NOT NULL,
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    modified_at TEXT NOT NULL,
    UNIQUE (review_id, user_id)
);

CREATE TABLE IF NOT EXISTS creators (
    creator_id  TEXT PRIMARY KEY,
    review_id   TEXT NOT NULL REFERENCES reviews(review_id),
    user_id     TEXT NOT NULL,
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    modified_at TEXT NOT NULL,
    UNIQUE (review_id, user_id)
);

CREATE TABLE IF NOT EXISTS user_review_status (
    review_id   TEXT NOT NULL REFERENCES reviews(review_id),
    user_id     TEXT NOT NULL,
    read        INTEGER NOT NULL DEFAULT 0,
    modified_at TEXT NOT NULL,
    PRIMARY KEY (review_id, user_id)
);

-- One bundle per (review-or-none, owner). NULL review ids are folded to ''
-- so the unique index also covers review-less bundles.
CREATE TABLE IF NOT EXISTS bundles (
    bundle_id   TEXT PRIMARY KEY,
    review_id   TEXT REFERENCES reviews(review_id),
    owner_id    TEXT NOT NULL,
    read        INTEGER NOT NULL DEFAULT 0,
    deleted     INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    modified_at TEXT NOT NULL
);

-- Messages are immutable once written.
CREATE TABLE IF NOT EXISTS messages (
    message_id   TEXT PRIMARY KEY,
    bundle_id    TEXT NOT NULL REFERENCES bundles(bundle_id),
    recipient_id TEXT NOT NULL,
    sender_id    TEXT NOT NULL,
    review_id    TEXT,
    revision_id  TEXT,
    thread_id    TEXT,
    title        TEXT NOT NULL,
    template     TEXT NOT NULL,
    context      TEXT NOT NULL DEFAULT '{}',
    body         TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reminders (
    reminder_id TEXT PRIMARY KEY,
    review_id   TEXT NOT NULL REFERENCES reviews(review_id),
    user_id     TEXT NOT NULL,
    kind        TEXT NOT NULL,   -- 'creator' | 'reviewer'
    remind_at   TEXT NOT NULL,
    active      INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    modified_at TEXT NOT NULL,
    UNIQUE (review_id, user_id)
);

-- Events are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS events (
    event_id     TEXT PRIMARY KEY,
    project_id   TEXT NOT NULL,
    review_id    TEXT NOT NULL REFERENCES reviews(review_id),
    code         TEXT NOT NULL,
    related_type TEXT NOT NULL,
    related_id   TEXT NOT NULL,
    user_id      TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id   TEXT PRIMARY KEY,
    review_id    TEXT NOT NULL REFERENCES reviews(review_id),
    revision_id  TEXT NOT NULL REFERENCES revisions(revision_id),
    thread_id    TEXT NOT NULL,
    commenter_id TEXT NOT NULL,
    body         TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS issues (
    issue_id    TEXT PRIMARY KEY,
    review_id   TEXT NOT NULL REFERENCES reviews(review_id),
    comment_id  TEXT NOT NULL REFERENCES comments(comment_id),
    created_by  TEXT NOT NULL,
    resolved_by TEXT,
    created_at  TEXT NOT NULL,
    modified_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS bundles_owner_idx
    ON bundles(IFNULL(review_id, ''), owner_id);
CREATE UNIQUE INDEX IF NOT EXISTS issues_open_idx
    ON issues(review_id, comment_id) WHERE resolved_by IS NULL;
CREATE INDEX IF NOT EXISTS reminders_due_idx ON reminders(active, remind_at);
CREATE INDEX IF NOT EXISTS events_review_idx ON events(review_id);
CREATE INDEX IF NOT EXISTS messages_bundle_idx ON messages(bundle_id);
CREATE INDEX IF NOT EXISTS comments_review_idx ON comments(review_id);

PRAGMA user_version = 1;
";
