use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;

    let version: i32 =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    if version > SCHEMA_VERSION {
        return Err(StorageError::Serialization(format!(
            "journal schema version {version} is newer than supported version {SCHEMA_VERSION}"
        )));
    }
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

CREATE TABLE IF NOT EXISTS envelopes (
    rowid INTEGER PRIMARY KEY,
    envelope_id BLOB NOT NULL UNIQUE CHECK (length(envelope_id) = 16),
    batch_type TEXT,
    consistency TEXT,
    serial_consistency TEXT,
    statement_count INTEGER NOT NULL,
    checksum BLOB NOT NULL CHECK (length(checksum) = 32),
    executed_at INTEGER NOT NULL DEFAULT (CAST(unixepoch('now','subsec') * 1000 AS INTEGER))
);

CREATE TABLE IF NOT EXISTS journal_statements (
    envelope_id BLOB NOT NULL REFERENCES envelopes (envelope_id),
    position INTEGER NOT NULL,
    query TEXT NOT NULL,
    bound_values BLOB NOT NULL,
    PRIMARY KEY (envelope_id, position)
);
";
