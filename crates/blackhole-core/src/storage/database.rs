//! SQLite-based session history and key-value store.
//!
//! Provides persistent storage for:
//! - Completed sessions (append-only history)
//! - Session statistics (per day and all-time)
//! - Key-value store for configuration and timer snapshots

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{data_dir, KvStore, SessionRecorder};
use crate::error::StorageError;
use crate::timer::Phase;

/// One completed (never aborted) phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub auto_started: bool,
    /// UTC calendar date of `ended_at`.
    pub date: NaiveDate,
}

impl SessionRecord {
    pub fn completed(
        phase: Phase,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        auto_started: bool,
    ) -> Self {
        let ms = (ended_at - started_at).num_milliseconds().max(0) as u64;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            phase,
            started_at,
            ended_at,
            duration_secs: (ms + 500) / 1000,
            auto_started,
            date: ended_at.date_naive(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PhaseStats {
    pub sessions: u64,
    pub seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_sessions: u64,
    pub work: PhaseStats,
    pub short_break: PhaseStats,
    pub long_break: PhaseStats,
    pub auto_started: u64,
}

impl Stats {
    fn add(&mut self, phase: Phase, count: u64, seconds: u64, auto: u64) {
        self.total_sessions += count;
        self.auto_started += auto;
        let slot = match phase {
            Phase::Work => &mut self.work,
            Phase::ShortBreak => &mut self.short_break,
            Phase::LongBreak => &mut self.long_break,
        };
        slot.sessions += count;
        slot.seconds += seconds;
    }
}

/// SQLite database for session history and timer state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/blackhole/blackhole.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        Self::open_at(data_dir()?.join("blackhole.db"))
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id            TEXT PRIMARY KEY,
                phase         TEXT NOT NULL,
                started_at    TEXT NOT NULL,
                ended_at      TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                auto_started  INTEGER NOT NULL DEFAULT 0,
                date          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date);
            CREATE INDEX IF NOT EXISTS idx_sessions_ended_at ON sessions(ended_at);",
        )?;
        Ok(())
    }

    /// Append a completed session.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn insert_session(&self, record: &SessionRecord) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO sessions (id, phase, started_at, ended_at, duration_secs, auto_started, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.phase.as_str(),
                record.started_at.to_rfc3339(),
                record.ended_at.to_rfc3339(),
                record.duration_secs,
                record.auto_started,
                record.date.format("%Y-%m-%d").to_string(),
            ],
        )?;
        Ok(())
    }

    /// Most recent sessions first.
    pub fn history(&self, limit: usize) -> Result<Vec<SessionRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phase, started_at, ended_at, duration_secs, auto_started, date
             FROM sessions
             ORDER BY ended_at DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u64>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, phase, started_at, ended_at, duration_secs, auto_started, date) = row?;
            let parsed = (|| {
                Some(SessionRecord {
                    phase: phase.parse().ok()?,
                    started_at: parse_rfc3339(&started_at)?,
                    ended_at: parse_rfc3339(&ended_at)?,
                    date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?,
                    id: id.clone(),
                    duration_secs,
                    auto_started,
                })
            })();
            match parsed {
                Some(record) => out.push(record),
                None => tracing::warn!(%id, "skipping malformed session row"),
            }
        }
        Ok(out)
    }

    pub fn stats_for_date(&self, date: NaiveDate) -> Result<Stats, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT phase, COUNT(*), COALESCE(SUM(duration_secs), 0), COALESCE(SUM(auto_started), 0)
             FROM sessions
             WHERE date = ?1
             GROUP BY phase",
        )?;
        let rows = stmt.query_map(params![date.format("%Y-%m-%d").to_string()], stats_row)?;
        collect_stats(rows)
    }

    pub fn stats_today(&self) -> Result<Stats, rusqlite::Error> {
        self.stats_for_date(Utc::now().date_naive())
    }

    pub fn stats_all(&self) -> Result<Stats, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT phase, COUNT(*), COALESCE(SUM(duration_secs), 0), COALESCE(SUM(auto_started), 0)
             FROM sessions
             GROUP BY phase",
        )?;
        let rows = stmt.query_map([], stats_row)?;
        collect_stats(rows)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl KvStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.kv_get(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(self.kv_set(key, value)?)
    }
}

impl SessionRecorder for Database {
    fn record(&self, record: &SessionRecord) -> Result<(), StorageError> {
        Ok(self.insert_session(record)?)
    }
}

fn stats_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, u64, u64, u64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn collect_stats(
    rows: impl Iterator<Item = rusqlite::Result<(String, u64, u64, u64)>>,
) -> Result<Stats, rusqlite::Error> {
    let mut stats = Stats::default();
    for row in rows {
        let (phase, count, seconds, auto) = row?;
        match phase.parse::<Phase>() {
            Ok(phase) => stats.add(phase, count, seconds, auto),
            Err(_) => tracing::warn!(%phase, "unknown phase in session history"),
        }
    }
    Ok(stats)
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
