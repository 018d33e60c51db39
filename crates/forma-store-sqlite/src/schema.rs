//! SQL schema for the forma SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

-- One row per schema version. Rows are never rewritten: the only column an
-- UPDATE may touch is is_latest.
CREATE TABLE IF NOT EXISTS schemas (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL,
    version     INTEGER NOT NULL CHECK (version >= 1),
    parent_id   INTEGER REFERENCES schemas(id) DEFERRABLE INITIALLY DEFERRED,
    description TEXT    NOT NULL,
    prompt      TEXT    NOT NULL,
    fields      TEXT    NOT NULL,            -- JSON array of {name, type, description}
    is_builtin  INTEGER NOT NULL DEFAULT 0,
    is_latest   INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT    NOT NULL,            -- RFC 3339 UTC; server-assigned
    UNIQUE (name, version),
    CHECK  ((version = 1) = (parent_id IS NULL))
);

-- At most one current version per name.
CREATE UNIQUE INDEX IF NOT EXISTS schemas_one_latest_idx
    ON schemas(name) WHERE is_latest = 1;

CREATE TABLE IF NOT EXISTS generations (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    schema_id   INTEGER NOT NULL REFERENCES schemas(id) ON DELETE CASCADE,
    prompt      TEXT    NOT NULL,
    output      TEXT    NOT NULL,            -- JSON payload produced by the cast
    created_at  TEXT    NOT NULL,
    is_favorite INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS generations_schema_idx ON generations(schema_id);

CREATE TRIGGER IF NOT EXISTS schemas_content_immutable
BEFORE UPDATE OF name, version, parent_id, description, prompt, fields, is_builtin, created_at
ON schemas
BEGIN
    SELECT RAISE(ABORT, 'schema versions are immutable; append a new version instead');
END;

CREATE TRIGGER IF NOT EXISTS schemas_builtin_undeletable
BEFORE DELETE ON schemas
WHEN OLD.is_builtin = 1
BEGIN
    SELECT RAISE(ABORT, 'built-in schemas cannot be deleted');
END;

CREATE TRIGGER IF NOT EXISTS generations_pinned
BEFORE UPDATE OF schema_id, prompt, output, created_at
ON generations
BEGIN
    SELECT RAISE(ABORT, 'generations are immutable apart from is_favorite');
END;

PRAGMA user_version = 1;
";
