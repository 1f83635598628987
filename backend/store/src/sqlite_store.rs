//! SQLite-backed durable row store.
//!
//! One `status_tracker` row per user id. Counters are updated in place with
//! `col = col + ?` so a patch never needs the current value. Open intervals
//! live in the nullable `status_start`/`last_status` and `voice_start`
//! columns as epoch milliseconds.
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use statuskeeper_core::{
    KeeperError, PresenceStatus, StatusInterval, UserId, UserStatusRecord, VoiceInterval,
};

use crate::store::{RecordPatch, RowStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS status_tracker (
        user_id         TEXT PRIMARY KEY,
        online_seconds  INTEGER NOT NULL DEFAULT 0,
        idle_seconds    INTEGER NOT NULL DEFAULT 0,
        dnd_seconds     INTEGER NOT NULL DEFAULT 0,
        offline_seconds INTEGER NOT NULL DEFAULT 0,
        messages        INTEGER NOT NULL DEFAULT 0,
        voice_seconds   INTEGER NOT NULL DEFAULT 0,
        status_start    INTEGER,
        last_status     TEXT,
        voice_start     INTEGER
    );";

const SELECT_COLUMNS: &str = "user_id, online_seconds, idle_seconds, dnd_seconds, offline_seconds,
        messages, voice_seconds, status_start, last_status, voice_start";

pub struct SqliteRowStore {
    conn: Mutex<Connection>,
}

impl SqliteRowStore {
    /// Open or create the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("Failed to open SQLite status database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to enable WAL journal")?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        info!(path = %path.as_ref().display(), "Status store opened");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.lock()?
            .execute_batch(SCHEMA)
            .context("Failed to initialize status_tracker schema")?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| KeeperError::Storage("connection lock poisoned".to_string()).into())
    }
}

impl RowStore for SqliteRowStore {
    fn ensure(&self, user: UserId) -> Result<()> {
        let inserted = self.lock()?.execute(
            "INSERT OR IGNORE INTO status_tracker (user_id) VALUES (?1)",
            params![user.to_string()],
        )?;
        if inserted > 0 {
            debug!(user_id = %user, "Created status row");
        }
        Ok(())
    }

    fn get(&self, user: UserId) -> Result<Option<UserStatusRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM status_tracker WHERE user_id = ?1"),
                params![user.to_string()],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn update(&self, user: UserId, patch: &RecordPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        let mut bind = |clauses: &mut Vec<String>, template: &str, value: Value| {
            values.push(value);
            clauses.push(template.replace('?', &format!("?{}", values.len())));
        };

        if let Some((status, seconds)) = patch.credit {
            let col = bucket_column(status);
            bind(&mut clauses, &format!("{col} = {col} + ?"), Value::Integer(to_sql_int(seconds)));
        }
        if patch.add_messages > 0 {
            bind(&mut clauses, "messages = messages + ?", Value::Integer(to_sql_int(patch.add_messages)));
        }
        if patch.add_voice_seconds > 0 {
            bind(
                &mut clauses,
                "voice_seconds = voice_seconds + ?",
                Value::Integer(to_sql_int(patch.add_voice_seconds)),
            );
        }
        match patch.status {
            Some(StatusInterval::Open { status, started_at }) => {
                bind(&mut clauses, "status_start = ?", Value::Integer(started_at.timestamp_millis()));
                bind(&mut clauses, "last_status = ?", Value::Text(status.as_str().to_string()));
            }
            Some(StatusInterval::NoInterval) => {
                clauses.push("status_start = NULL".to_string());
                clauses.push("last_status = NULL".to_string());
            }
            None => {}
        }
        match patch.voice {
            Some(VoiceInterval::Open { started_at }) => {
                bind(&mut clauses, "voice_start = ?", Value::Integer(started_at.timestamp_millis()));
            }
            Some(VoiceInterval::NotInVoice) => clauses.push("voice_start = NULL".to_string()),
            None => {}
        }

        values.push(Value::Text(user.to_string()));
        let sql = format!(
            "UPDATE status_tracker SET {} WHERE user_id = ?{}",
            clauses.join(", "),
            values.len()
        );
        self.lock()?.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM status_tracker", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

// ---------------------------------------------------------------------------
// Column mapping helpers
// ---------------------------------------------------------------------------

fn bucket_column(status: PresenceStatus) -> &'static str {
    match status {
        PresenceStatus::Online => "online_seconds",
        PresenceStatus::Idle => "idle_seconds",
        PresenceStatus::Dnd => "dnd_seconds",
        PresenceStatus::Offline => "offline_seconds",
    }
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_sql_int(value: i64) -> u64 {
    value.max(0) as u64
}

fn millis_to_utc(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<UserStatusRecord> {
    let user_id: String = row.get(0)?;
    let status_start: Option<i64> = row.get(7)?;
    let last_status: Option<String> = row.get(8)?;
    let voice_start: Option<i64> = row.get(9)?;

    let user_id = user_id
        .parse::<UserId>()
        .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?;

    // Both halves must be present for the interval to count as open.
    let status = match (status_start.and_then(millis_to_utc), last_status.as_deref()) {
        (Some(started_at), Some(name)) => match name.parse::<PresenceStatus>() {
            Ok(status) => StatusInterval::Open { status, started_at },
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Ignoring unreadable open status interval");
                StatusInterval::NoInterval
            }
        },
        _ => StatusInterval::NoInterval,
    };

    let voice = match voice_start.and_then(millis_to_utc) {
        Some(started_at) => VoiceInterval::Open { started_at },
        None => VoiceInterval::NotInVoice,
    };

    Ok(UserStatusRecord {
        user_id,
        online_seconds: from_sql_int(row.get(1)?),
        idle_seconds: from_sql_int(row.get(2)?),
        dnd_seconds: from_sql_int(row.get(3)?),
        offline_seconds: from_sql_int(row.get(4)?),
        messages: from_sql_int(row.get(5)?),
        voice_seconds: from_sql_int(row.get(6)?),
        status,
        voice,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap() + chrono::Duration::seconds(secs as i64)
    }

    #[test]
    fn test_ensure_creates_zeroed_row() {
        let store = SqliteRowStore::in_memory().unwrap();
        let user = UserId(123456789012345678);
        assert!(store.get(user).unwrap().is_none());

        store.ensure(user).unwrap();
        store.ensure(user).unwrap();

        let row = store.get(user).unwrap().unwrap();
        assert_eq!(row, UserStatusRecord::new(user));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_counters_accumulate() {
        let store = SqliteRowStore::in_memory().unwrap();
        let user = UserId(5);
        store.ensure(user).unwrap();

        store
            .update(user, &RecordPatch::new().credit_status(PresenceStatus::Online, 40))
            .unwrap();
        store
            .update(
                user,
                &RecordPatch::new()
                    .credit_status(PresenceStatus::Online, 2)
                    .add_messages(1)
                    .add_voice_seconds(30),
            )
            .unwrap();

        let row = store.get(user).unwrap().unwrap();
        assert_eq!(row.online_seconds, 42);
        assert_eq!(row.messages, 1);
        assert_eq!(row.voice_seconds, 30);
        assert_eq!(row.idle_seconds + row.dnd_seconds + row.offline_seconds, 0);
    }

    #[test]
    fn test_intervals_persist_and_clear() {
        let store = SqliteRowStore::in_memory().unwrap();
        let user = UserId(8);
        store.ensure(user).unwrap();

        store
            .update(
                user,
                &RecordPatch::new()
                    .set_status(StatusInterval::open(PresenceStatus::Dnd, at(0)))
                    .set_voice(VoiceInterval::Open { started_at: at(5) }),
            )
            .unwrap();
        let row = store.get(user).unwrap().unwrap();
        assert_eq!(row.status, StatusInterval::open(PresenceStatus::Dnd, at(0)));
        assert_eq!(row.voice, VoiceInterval::Open { started_at: at(5) });

        store
            .update(
                user,
                &RecordPatch::new()
                    .set_status(StatusInterval::NoInterval)
                    .set_voice(VoiceInterval::NotInVoice),
            )
            .unwrap();
        let row = store.get(user).unwrap().unwrap();
        assert_eq!(row.status, StatusInterval::NoInterval);
        assert_eq!(row.voice, VoiceInterval::NotInVoice);
    }

    #[test]
    fn test_half_open_status_reads_as_no_interval() {
        let store = SqliteRowStore::in_memory().unwrap();
        let user = UserId(77);
        store.ensure(user).unwrap();
        store
            .lock()
            .unwrap()
            .execute(
                "UPDATE status_tracker SET status_start = ?1 WHERE user_id = ?2",
                params![at(0).timestamp_millis(), user.to_string()],
            )
            .unwrap();

        let row = store.get(user).unwrap().unwrap();
        assert_eq!(row.status, StatusInterval::NoInterval);
    }

    #[test]
    fn test_update_missing_row_writes_nothing() {
        let store = SqliteRowStore::in_memory().unwrap();
        store
            .update(UserId(1), &RecordPatch::new().add_messages(1))
            .unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }
}
