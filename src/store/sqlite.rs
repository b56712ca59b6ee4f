use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{Result, TubeError};
use crate::domain::{FeedKey, FeedRecord};
use crate::store::Store;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| TubeError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            TubeError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }
}

impl Store for SqliteStore {
    fn get(&self, key: &FeedKey) -> Result<Option<FeedRecord>> {
        let conn = self.conn()?;

        let raw: Option<String> = conn
            .query_row(
                "SELECT record FROM feeds WHERE key = ?1",
                params![key.storage_key()],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &FeedKey, record: &FeedRecord) -> Result<()> {
        if record.key() != key {
            return Err(TubeError::InvalidFeedId(format!(
                "record for {} cannot be stored under {}",
                record.key(),
                key
            )));
        }

        let raw = serde_json::to_string(record)?;
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO feeds (key, feed_type, feed_id, record, updated_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(key) DO UPDATE SET record = excluded.record, updated_at = excluded.updated_at",
            params![
                key.storage_key(),
                key.feed_type().as_str(),
                key.id(),
                raw,
                record.updated_at.map(|t| t.to_rfc3339()),
                Utc::now().to_rfc3339()
            ],
        )?;

        Ok(())
    }

    fn delete(&self, key: &FeedKey) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM feeds WHERE key = ?1",
            params![key.storage_key()],
        )?;
        Ok(deleted > 0)
    }

    fn list_keys(&self) -> Result<Vec<FeedKey>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM feeds ORDER BY key")?;

        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw.iter().map(|k| FeedKey::parse_storage_key(k)).collect()
    }

    fn checked_at(&self, key: &FeedKey) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn()?;

        let raw: Option<Option<String>> = conn
            .query_row(
                "SELECT checked_at FROM feeds WHERE key = ?1",
                params![key.storage_key()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.flatten().and_then(|s| Self::parse_datetime(&s)))
    }

    fn mark_checked(&self, key: &FeedKey, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE feeds SET checked_at = ?1 WHERE key = ?2",
            params![at.to_rfc3339(), key.storage_key()],
        )?;
        Ok(())
    }
}
