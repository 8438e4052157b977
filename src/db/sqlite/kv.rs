//! Key/value storage

use rusqlite::{Connection, OptionalExtension};

/// Read a value by key
pub fn get(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM kv_store WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
}

/// Insert or overwrite a value
pub fn put(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO kv_store (key, value)
         VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET
           value = excluded.value,
           updated_at = datetime('now')",
        rusqlite::params![key, value],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::migrations::run_migrations;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_put_overwrites_whole_value() {
        let conn = create_test_db();

        put(&conn, "alerts", "[1]").unwrap();
        put(&conn, "alerts", "[2,3]").unwrap();

        assert_eq!(get(&conn, "alerts").unwrap().as_deref(), Some("[2,3]"));
    }

    #[test]
    fn test_missing_key_is_none() {
        let conn = create_test_db();
        assert_eq!(get(&conn, "snapshot").unwrap(), None);
    }
}
