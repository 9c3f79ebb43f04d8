//! SQLite-based session history and application state.
//!
//! Provides persistent storage for:
//! - Finished sleep sessions with the streak ending at each
//! - History statistics
//! - Key-value store for the goal, tracking flag and cached mascot state

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration as StdDuration;

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations, SessionHistory, StateStore, TrackingState};
use crate::error::{DatabaseError, Result};
use crate::mascot::{MascotState, MessageState};
use crate::session::{SleepRecord, SleepSession};

/// Local wall-clock timestamps as stored in TEXT columns.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub(crate) const KEY_GOAL: &str = "goal";
const KEY_TRACKING: &str = "tracking.active";
const KEY_TRACKING_START: &str = "tracking.start";
const KEY_MASCOT: &str = "mascot.state";
const KEY_MESSAGE: &str = "mascot.message";

pub fn encode_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn decode_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).ok()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_sessions: u64,
    pub goals_met: u64,
    pub total_sleep_minutes: i64,
    pub average_sleep_minutes: Option<f64>,
    pub best_streak: u32,
    pub last_streak: u32,
}

/// SQLite database for sessions and state.
///
/// The connection is shared between the tracker and the CLI commands, so it
/// sits behind a mutex; every call holds it only for one statement or one
/// transaction.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/sleepbuddy/sleepbuddy.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("sleepbuddy.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        // The daemon and one-shot CLI invocations share the file.
        conn.busy_timeout(StdDuration::from_secs(5))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned.into())
    }

    // ── Key-value ────────────────────────────────────────────────────

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        Ok(kv_value(&*self.conn()?, key)?)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

}

fn kv_value(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
        .optional()
}

fn clear_tracking(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, 'false')",
        params![KEY_TRACKING],
    )?;
    conn.execute("DELETE FROM kv WHERE key = ?1", params![KEY_TRACKING_START])?;
    Ok(())
}

fn insert_record(conn: &Connection, session: &SleepSession, streak: u32) -> Result<i64> {
    let end_time = session.end_time.ok_or_else(|| {
        DatabaseError::QueryFailed("cannot store a session without an end time".into())
    })?;
    let duration = session
        .duration_minutes
        .unwrap_or_else(|| session.minutes_until(end_time));
    conn.execute(
        "INSERT INTO sleep_records (start_time, end_time, duration_minutes, goal_met, streak)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            encode_timestamp(session.start_time),
            encode_timestamp(end_time),
            duration,
            session.goal_met,
            streak,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SleepRecord> {
    let timestamp = |idx: usize| -> rusqlite::Result<NaiveDateTime> {
        let raw: String = row.get(idx)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    };
    Ok(SleepRecord {
        id: row.get(0)?,
        session: SleepSession {
            start_time: timestamp(1)?,
            end_time: Some(timestamp(2)?),
            duration_minutes: Some(row.get(3)?),
            goal_met: row.get(4)?,
        },
        streak: row.get(5)?,
    })
}

const RECORD_COLUMNS: &str = "id, start_time, end_time, duration_minutes, goal_met, streak";

impl SessionHistory for Database {
    fn append_session(&self, session: &SleepSession, streak: u32) -> Result<i64> {
        insert_record(&*self.conn()?, session, streak)
    }

    fn finish_session(&self, session: &SleepSession, streak: u32) -> Result<Option<i64>> {
        let mut conn = self.conn()?;
        // IMMEDIATE takes the write lock up front, so two processes stopping
        // the same session serialize on the liveness check.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let active = kv_value(&tx, KEY_TRACKING)?;
        let start = kv_value(&tx, KEY_TRACKING_START)?;
        let live = active.as_deref() == Some("true")
            && start.as_deref().and_then(decode_timestamp) == Some(session.start_time);
        if !live {
            return Ok(None);
        }
        let id = insert_record(&tx, session, streak)?;
        clear_tracking(&tx)?;
        tx.commit()?;
        Ok(Some(id))
    }

    fn last_session(&self) -> Result<Option<SleepRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM sleep_records ORDER BY id DESC LIMIT 1"),
                [],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn last_streak(&self) -> Result<Option<u32>> {
        let conn = self.conn()?;
        let streak = conn
            .query_row(
                "SELECT streak FROM sleep_records ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get::<_, u32>(0),
            )
            .optional()?;
        Ok(streak)
    }

    fn overwrite_last_streak(&self, streak: u32) -> Result<()> {
        self.conn()?.execute(
            "UPDATE sleep_records SET streak = ?1
             WHERE id = (SELECT MAX(id) FROM sleep_records)",
            params![streak],
        )?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<SleepRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM sleep_records ORDER BY id DESC LIMIT ?1"
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], record_from_row)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn stats(&self) -> Result<HistoryStats> {
        let conn = self.conn()?;
        let (total, met, minutes, best): (u64, u64, i64, u32) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(goal_met), 0),
                    COALESCE(SUM(duration_minutes), 0),
                    COALESCE(MAX(streak), 0)
             FROM sleep_records",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        let last: u32 = conn
            .query_row(
                "SELECT streak FROM sleep_records ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);

        Ok(HistoryStats {
            total_sessions: total,
            goals_met: met,
            total_sleep_minutes: minutes,
            average_sleep_minutes: (total > 0).then(|| minutes as f64 / total as f64),
            best_streak: best,
            last_streak: last,
        })
    }
}

impl StateStore for Database {
    fn tracking(&self) -> Result<TrackingState> {
        let is_tracking = self.kv_get(KEY_TRACKING)?.as_deref() == Some("true");
        if !is_tracking {
            return Ok(TrackingState::default());
        }
        let raw = self.kv_get(KEY_TRACKING_START)?;
        let started_at = raw.as_deref().and_then(decode_timestamp);
        if started_at.is_none() {
            tracing::warn!(stored = ?raw, "tracking start time missing or unreadable");
        }
        Ok(TrackingState {
            is_tracking,
            started_at,
        })
    }

    fn set_tracking(&self, started_at: Option<NaiveDateTime>) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        match started_at {
            Some(at) => {
                tx.execute(
                    "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, 'true')",
                    params![KEY_TRACKING],
                )?;
                tx.execute(
                    "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                    params![KEY_TRACKING_START, encode_timestamp(at)],
                )?;
            }
            None => clear_tracking(&tx)?,
        }
        tx.commit()?;
        Ok(())
    }

    fn mascot(&self) -> Result<MascotState> {
        Ok(MascotState::decode_or_default(self.kv_get(KEY_MASCOT)?.as_deref()))
    }

    fn set_mascot(&self, state: MascotState) -> Result<()> {
        self.kv_set(KEY_MASCOT, state.as_str())
    }

    fn message(&self) -> Result<MessageState> {
        Ok(MessageState::decode_or_default(self.kv_get(KEY_MESSAGE)?.as_deref()))
    }

    fn set_message(&self, message: MessageState) -> Result<()> {
        self.kv_set(KEY_MESSAGE, message.as_str())
    }
}
