use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;

/// A raw cache entry as stored on disk.
#[derive(Debug, Clone)]
pub struct StoredValue {
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Whole-value key/value store backing the resilient cache.
///
/// Writes replace the previous value for a key; there is no multi-key
/// transaction.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<StoredValue>>;
    fn put(&self, key: &str, value: &str, updated_at: DateTime<Utc>) -> Result<()>;
}

/// Thread-safe SQLite connection pool (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Private in-memory database, used by tests and `--cache-path :memory:`.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("cache database mutex poisoned"))
    }

    /// Number of stored entries, for the health endpoint.
    pub fn entry_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |r| r.get(0))?;
        Ok(count)
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT value, updated_at FROM cache_entries WHERE key = ?1",
                params![key],
                |row| {
                    Ok(StoredValue {
                        value: row.get(0)?,
                        updated_at: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn put(&self, key: &str, value: &str, updated_at: DateTime<Utc>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO cache_entries (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value=excluded.value,
                updated_at=excluded.updated_at",
            params![key, value, updated_at],
        )?;
        Ok(())
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    key         TEXT    PRIMARY KEY,
    value       TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_get_missing_key() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get("recent:cricket").unwrap().is_none());
    }

    #[test]
    fn test_put_replaces_whole_value() {
        let db = Database::open_in_memory().unwrap();
        let t0 = Utc::now();
        db.put("snapshot:football", "[1]", t0).unwrap();
        db.put("snapshot:football", "[2]", t0 + Duration::seconds(5)).unwrap();

        let stored = db.get("snapshot:football").unwrap().unwrap();
        assert_eq!(stored.value, "[2]");
        assert_eq!(stored.updated_at, t0 + Duration::seconds(5));
        assert_eq!(db.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().unwrap();
        db.put("detail:x", "{}", Utc::now()).unwrap();
        db.run_migrations().unwrap();
        assert_eq!(db.entry_count().unwrap(), 1);
    }
}
