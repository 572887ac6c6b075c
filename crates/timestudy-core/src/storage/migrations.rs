//! Database schema migrations for timestudy.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: shifts with their intervals, stopwatch runs with their laps,
/// and the key-value table holding active-session slots.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS shifts (
            id                TEXT PRIMARY KEY,
            subject_name      TEXT NOT NULL,
            session_start     TEXT NOT NULL,
            session_end       TEXT NOT NULL,
            total_duration_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS shift_intervals (
            shift_id        TEXT NOT NULL,
            kind            TEXT NOT NULL,
            sequence_number INTEGER NOT NULL,
            start_time      TEXT NOT NULL,
            end_time        TEXT NOT NULL,
            duration_ms     INTEGER NOT NULL,
            label           TEXT,
            paused_ms       INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (shift_id, kind, sequence_number)
        );

        CREATE TABLE IF NOT EXISTS lap_sessions (
            id         TEXT PRIMARY KEY,
            name       TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time   TEXT,
            total_laps INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS laps (
            session_id         TEXT NOT NULL,
            lap_number         INTEGER NOT NULL,
            lap_time_ms        INTEGER NOT NULL,
            cumulative_time_ms INTEGER NOT NULL,
            note               TEXT NOT NULL DEFAULT '',
            recorded_at        TEXT NOT NULL,
            PRIMARY KEY (session_id, lap_number)
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_shifts_session_start ON shifts(session_start);
        CREATE INDEX IF NOT EXISTS idx_lap_sessions_start_time ON lap_sessions(start_time);
        CREATE INDEX IF NOT EXISTS idx_lap_sessions_created_at ON lap_sessions(created_at);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_sets_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_schema_version(&conn), 0);
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('shifts', 'shift_intervals', 'lap_sessions', 'laps', 'kv')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 5);
    }
}
