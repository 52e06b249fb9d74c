use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    // busy_timeout first: switching to WAL needs a lock another handle may hold.
    conn.execute_batch(
        "
        PRAGMA busy_timeout = 5000;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

// Links and markers carry no foreign key to portal: the replace path upserts
// each referenced portal right before the row that needs it. The cascade from
// operation is only a backstop for the explicit deletes.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS operation (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    owner TEXT NOT NULL,
    color TEXT NOT NULL,
    team_id TEXT
);
CREATE INDEX IF NOT EXISTS idx_operation_owner ON operation (owner);
CREATE INDEX IF NOT EXISTS idx_operation_team ON operation (team_id) WHERE team_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS portal (
    id TEXT NOT NULL,
    operation_id TEXT NOT NULL REFERENCES operation (id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    lat TEXT NOT NULL,
    lon TEXT NOT NULL,
    comment TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (operation_id, id)
);

CREATE TABLE IF NOT EXISTS link (
    id TEXT NOT NULL,
    operation_id TEXT NOT NULL REFERENCES operation (id) ON DELETE CASCADE,
    from_portal_id TEXT NOT NULL,
    to_portal_id TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    assigned_to TEXT,
    PRIMARY KEY (operation_id, id)
);

CREATE TABLE IF NOT EXISTS marker (
    id TEXT NOT NULL,
    operation_id TEXT NOT NULL REFERENCES operation (id) ON DELETE CASCADE,
    portal_id TEXT NOT NULL,
    marker_type TEXT NOT NULL,
    comment TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (operation_id, id)
);
";
