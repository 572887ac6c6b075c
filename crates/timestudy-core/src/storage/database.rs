//! SQLite-based session storage.
//!
//! Provides persistent storage for:
//! - Finalized shifts with their cycles and breaks
//! - Saved stopwatch runs with their laps
//! - Key-value store for the active shift and stopwatch slots

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::{data_dir, migrations, SessionStore};
use crate::error::{CoreError, DatabaseError, Result};
use crate::session::{SessionId, SessionKind, StoredSession};
use crate::shift::{FinalizedShift, IntervalKind, TimeInterval};
use crate::timer::{Lap, LapSession};

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/timestudy.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("timestudy.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "database opened");
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn kv_delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    // ── Writes ───────────────────────────────────────────────────────

    fn put_shift(&self, shift: &FinalizedShift) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO shifts (id, subject_name, session_start, session_end, total_duration_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                shift.id.as_str(),
                shift.subject_name,
                ts(&shift.session_start),
                ts(&shift.session_end),
                to_i64(shift.total_duration_ms)?,
            ],
        )?;
        tx.execute(
            "DELETE FROM shift_intervals WHERE shift_id = ?1",
            params![shift.id.as_str()],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO shift_intervals
                 (shift_id, kind, sequence_number, start_time, end_time, duration_ms, label, paused_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for kind in [IntervalKind::Cycle, IntervalKind::Break] {
                for interval in shift.intervals(kind) {
                    stmt.execute(params![
                        shift.id.as_str(),
                        kind.as_str(),
                        interval.sequence_number,
                        ts(&interval.start),
                        ts(&interval.end),
                        to_i64(interval.duration_ms)?,
                        interval.label,
                        to_i64(interval.paused_ms)?,
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn put_laps(&self, session: &LapSession) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO lap_sessions (id, name, start_time, end_time, total_laps, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.id.as_str(),
                session.name,
                ts(&session.start_time),
                session.end_time.as_ref().map(ts),
                session.total_laps as i64,
                ts(&session.created_at),
            ],
        )?;
        tx.execute(
            "DELETE FROM laps WHERE session_id = ?1",
            params![session.id.as_str()],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO laps (session_id, lap_number, lap_time_ms, cumulative_time_ms, note, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for lap in &session.laps {
                stmt.execute(params![
                    session.id.as_str(),
                    lap.sequence_number,
                    to_i64(lap.lap_duration_ms)?,
                    to_i64(lap.cumulative_duration_ms)?,
                    lap.note,
                    ts(&lap.recorded_at),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ── Reads ────────────────────────────────────────────────────────

    fn get_shift(&self, id: &SessionId) -> Result<Option<FinalizedShift>> {
        let row = self
            .conn
            .query_row(
                "SELECT subject_name, session_start, session_end, total_duration_ms
                 FROM shifts WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;
        let Some((subject_name, start, end, total)) = row else {
            return Ok(None);
        };

        Ok(Some(FinalizedShift {
            id: id.clone(),
            subject_name,
            session_start: parse_ts(&start, "shifts")?,
            session_end: parse_ts(&end, "shifts")?,
            total_duration_ms: to_u64(total, "shifts")?,
            cycles: self.intervals(id, IntervalKind::Cycle)?,
            breaks: self.intervals(id, IntervalKind::Break)?,
        }))
    }

    fn intervals(&self, id: &SessionId, kind: IntervalKind) -> Result<Vec<TimeInterval>> {
        let mut stmt = self.conn.prepare(
            "SELECT sequence_number, start_time, end_time, duration_ms, label, paused_ms
             FROM shift_intervals
             WHERE shift_id = ?1 AND kind = ?2
             ORDER BY sequence_number",
        )?;
        let rows = stmt.query_map(params![id.as_str(), kind.as_str()], raw_interval)?;

        let mut intervals = Vec::new();
        for row in rows {
            let (sequence_number, start, end, duration, label, paused) = row?;
            intervals.push(TimeInterval {
                sequence_number,
                start: parse_ts(&start, "shift_intervals")?,
                end: parse_ts(&end, "shift_intervals")?,
                duration_ms: to_u64(duration, "shift_intervals")?,
                label,
                paused_ms: to_u64(paused, "shift_intervals")?,
            });
        }
        Ok(intervals)
    }

    fn get_laps(&self, id: &SessionId) -> Result<Option<LapSession>> {
        let row = self
            .conn
            .query_row(
                "SELECT name, start_time, end_time, total_laps, created_at
                 FROM lap_sessions WHERE id = ?1",
                params![id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((name, start, end, total_laps, created_at)) = row else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT lap_number, lap_time_ms, cumulative_time_ms, note, recorded_at
             FROM laps WHERE session_id = ?1
             ORDER BY lap_number",
        )?;
        let rows = stmt.query_map(params![id.as_str()], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        let mut laps = Vec::new();
        for row in rows {
            let (sequence_number, lap_ms, cumulative_ms, note, recorded_at) = row?;
            laps.push(Lap {
                sequence_number,
                lap_duration_ms: to_u64(lap_ms, "laps")?,
                cumulative_duration_ms: to_u64(cumulative_ms, "laps")?,
                note,
                recorded_at: parse_ts(&recorded_at, "laps")?,
            });
        }

        Ok(Some(LapSession {
            id: id.clone(),
            name,
            start_time: parse_ts(&start, "lap_sessions")?,
            end_time: end.as_deref().map(|e| parse_ts(e, "lap_sessions")).transpose()?,
            total_laps: to_u64(total_laps, "lap_sessions")? as usize,
            created_at: parse_ts(&created_at, "lap_sessions")?,
            laps,
        }))
    }

    fn ids(&self, sql: &str) -> Result<Vec<SessionId>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(SessionId::from(row?));
        }
        Ok(ids)
    }
}

impl SessionStore for Database {
    fn put(&mut self, record: &StoredSession) -> Result<SessionId> {
        match record {
            StoredSession::Shift(shift) => self.put_shift(shift)?,
            StoredSession::Laps(session) => self.put_laps(session)?,
        }
        debug!(id = %record.id(), kind = record.kind().as_str(), "session stored");
        Ok(record.id().clone())
    }

    fn get(&self, id: &SessionId) -> Result<Option<StoredSession>> {
        if let Some(shift) = self.get_shift(id)? {
            return Ok(Some(StoredSession::Shift(shift)));
        }
        Ok(self.get_laps(id)?.map(StoredSession::Laps))
    }

    fn list(&self, kind: SessionKind) -> Result<Vec<StoredSession>> {
        let mut sessions = Vec::new();
        match kind {
            SessionKind::Shift => {
                for id in self.ids("SELECT id FROM shifts ORDER BY session_start, id")? {
                    if let Some(shift) = self.get_shift(&id)? {
                        sessions.push(StoredSession::Shift(shift));
                    }
                }
            }
            SessionKind::Stopwatch => {
                for id in self.ids("SELECT id FROM lap_sessions ORDER BY start_time, id")? {
                    if let Some(session) = self.get_laps(&id)? {
                        sessions.push(StoredSession::Laps(session));
                    }
                }
            }
        }
        Ok(sessions)
    }

    fn delete(&mut self, id: &SessionId) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM shift_intervals WHERE shift_id = ?1",
            params![id.as_str()],
        )?;
        tx.execute("DELETE FROM laps WHERE session_id = ?1", params![id.as_str()])?;
        let removed = tx.execute("DELETE FROM shifts WHERE id = ?1", params![id.as_str()])?
            + tx.execute("DELETE FROM lap_sessions WHERE id = ?1", params![id.as_str()])?;
        if removed == 0 {
            // Dropping the transaction rolls it back.
            return Err(CoreError::not_found(format!("session {id}")));
        }
        tx.commit()?;
        info!(%id, "session deleted");
        Ok(())
    }

    fn delete_all(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        for table in ["shift_intervals", "shifts", "laps", "lap_sessions"] {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        tx.commit()?;
        info!("all sessions deleted");
        Ok(())
    }
}

type RawInterval = (u32, String, String, i64, Option<String>, i64);

fn raw_interval(row: &Row) -> rusqlite::Result<RawInterval> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn ts(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(value: &str, table: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(table, format!("bad timestamp '{value}': {e}")))
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| CoreError::validation(format!("value {value} does not fit in the database")))
}

fn to_u64(value: i64, table: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| corrupt(table, format!("negative value {value}")))
}

fn corrupt(table: &str, message: String) -> CoreError {
    DatabaseError::CorruptRecord {
        table: table.to_string(),
        message,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::milliseconds(ms)
    }

    fn sample_shift(id: &str, start_ms: i64) -> FinalizedShift {
        FinalizedShift {
            id: SessionId::from(id),
            subject_name: "Ana".into(),
            session_start: at(start_ms),
            session_end: at(start_ms + 10_000),
            total_duration_ms: 10_000,
            cycles: vec![
                TimeInterval::closed(1, at(start_ms + 500), at(start_ms + 2000), Some("weld".into()), 500),
                TimeInterval::closed(2, at(start_ms + 3000), at(start_ms + 4000), None, 0),
            ],
            breaks: vec![TimeInterval::closed(1, at(start_ms + 1000), at(start_ms + 1500), None, 0)],
        }
    }

    #[test]
    fn shift_survives_storage() {
        let mut db = Database::open_memory().unwrap();
        let shift = sample_shift("s1", 0);
        db.put(&StoredSession::Shift(shift.clone())).unwrap();
        let loaded = db.get(&shift.id).unwrap().unwrap();
        assert_eq!(loaded, StoredSession::Shift(shift));
    }

    #[test]
    fn lap_session_upsert_replaces_laps() {
        let mut db = Database::open_memory().unwrap();
        let mut session = LapSession {
            id: SessionId::from("run"),
            name: "Line A".into(),
            start_time: at(0),
            end_time: None,
            total_laps: 1,
            created_at: at(0),
            laps: vec![Lap {
                sequence_number: 1,
                lap_duration_ms: 1000,
                cumulative_duration_ms: 1000,
                note: String::new(),
                recorded_at: at(1000),
            }],
        };
        db.put(&StoredSession::Laps(session.clone())).unwrap();

        session.laps.push(Lap {
            sequence_number: 2,
            lap_duration_ms: 500,
            cumulative_duration_ms: 1500,
            note: "check".into(),
            recorded_at: at(1500),
        });
        session.total_laps = 2;
        session.end_time = Some(at(2000));
        db.put(&StoredSession::Laps(session.clone())).unwrap();

        let listed = db.list(SessionKind::Stopwatch).unwrap();
        assert_eq!(listed, vec![StoredSession::Laps(session)]);
    }

    #[test]
    fn delete_removes_children() {
        let mut db = Database::open_memory().unwrap();
        let shift = sample_shift("s1", 0);
        db.put(&StoredSession::Shift(shift.clone())).unwrap();
        db.delete(&shift.id).unwrap();
        assert!(db.get(&shift.id).unwrap().is_none());
        let orphans: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM shift_intervals", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
        assert!(matches!(db.delete(&shift.id), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn list_orders_by_start_and_filters_kind() {
        let mut db = Database::open_memory().unwrap();
        db.put(&StoredSession::Shift(sample_shift("later", 50_000))).unwrap();
        db.put(&StoredSession::Shift(sample_shift("earlier", 0))).unwrap();
        let ids: Vec<String> = db
            .list(SessionKind::Shift)
            .unwrap()
            .iter()
            .map(|s| s.id().to_string())
            .collect();
        assert_eq!(ids, vec!["earlier", "later"]);
        assert!(db.list(SessionKind::Stopwatch).unwrap().is_empty());
    }

    #[test]
    fn delete_all_keeps_kv() {
        let mut db = Database::open_memory().unwrap();
        db.put(&StoredSession::Shift(sample_shift("s1", 0))).unwrap();
        db.kv_set("active_shift", "{}").unwrap();
        db.delete_all().unwrap();
        assert!(db.list(SessionKind::Shift).unwrap().is_empty());
        assert_eq!(db.kv_get("active_shift").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn failed_delete_all_rolls_back_and_leaves_connection_usable() {
        let mut db = Database::open_memory().unwrap();
        let shift = sample_shift("s1", 0);
        db.put(&StoredSession::Shift(shift.clone())).unwrap();
        db.conn()
            .execute_batch(
                "CREATE TRIGGER keep_shifts BEFORE DELETE ON shifts
                 BEGIN SELECT RAISE(ABORT, 'locked'); END;",
            )
            .unwrap();

        assert!(db.delete_all().is_err());
        assert_eq!(
            db.get(&shift.id).unwrap(),
            Some(StoredSession::Shift(shift.clone()))
        );

        // No transaction is left open behind the failure.
        db.put(&StoredSession::Shift(sample_shift("s2", 10))).unwrap();
        db.conn().execute_batch("DROP TRIGGER keep_shifts;").unwrap();
        db.delete_all().unwrap();
        assert!(db.list(SessionKind::Shift).unwrap().is_empty());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_delete("test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }
}
