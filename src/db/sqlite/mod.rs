//! SQLite database module

mod kv;
mod migrations;
mod settings;

use crate::db::KvStore;
use crate::error::{Result, StorageError};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// SQLite database wrapper
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Create new SQLite database connection
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    // ========== Settings Methods ==========

    /// Preferred quote currency, `usd` when never set
    pub fn get_currency(&self) -> Result<String> {
        let conn = self.conn.lock();
        settings::get_currency(&conn)
    }

    /// Persist the preferred quote currency
    pub fn set_currency(&self, currency: &str) -> Result<String> {
        let conn = self.conn.lock();
        settings::set_currency(&conn, currency)
    }

    /// Whether the one-time region onboarding already ran
    pub fn has_seen_onboarding(&self) -> Result<bool> {
        let conn = self.conn.lock();
        settings::has_seen_onboarding(&conn)
    }

    /// Record that onboarding ran
    pub fn mark_onboarding_seen(&self) -> Result<()> {
        let conn = self.conn.lock();
        settings::mark_onboarding_seen(&conn)
    }
}

impl KvStore for SqliteDb {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        let conn = self.conn.lock();
        kv::get(&conn, key).map_err(|e| StorageError::Unreadable(e.to_string()))
    }

    fn put(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
        let conn = self.conn.lock();
        kv::put(&conn, key, value).map_err(|e| StorageError::WriteFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("coinwatch.db");

        {
            let db = SqliteDb::new(&path).unwrap();
            db.put("snapshot", r#"{"coins":[]}"#).unwrap();
            db.set_currency("eur").unwrap();
        }

        let db = SqliteDb::new(&path).unwrap();
        assert_eq!(db.get("snapshot").unwrap().as_deref(), Some(r#"{"coins":[]}"#));
        assert_eq!(db.get_currency().unwrap(), "eur");
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = SqliteDb::open_in_memory().unwrap();
        db.run_migrations().unwrap();
        db.run_migrations().unwrap();
        assert_eq!(db.get("missing").unwrap(), None);
    }
}
