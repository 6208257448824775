//! Local database migrations.
//!
//! Each step is applied in its own transaction together with the bump of
//! `PRAGMA user_version`, so a half-applied schema is never recorded.

use rusqlite::Connection;

use crate::error::MecalError;

/// Schema steps; step `n` (1-based) upgrades version `n - 1` to `n`.
const STEPS: &[&str] = &[
    // 1: sync queue and key/value cache
    r"
    CREATE TABLE sync_queue (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        operation_type TEXT NOT NULL,
        payload TEXT NOT NULL,
        created_at TEXT NOT NULL,
        attempts INTEGER NOT NULL DEFAULT 0,
        last_attempt TEXT,
        last_error TEXT,
        status TEXT NOT NULL DEFAULT 'pending'
    );
    CREATE INDEX idx_sync_queue_status ON sync_queue(status);

    CREATE TABLE cache_entries (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    ",
];

/// Schema version this build expects.
#[must_use]
pub fn latest() -> i32 {
    i32::try_from(STEPS.len()).unwrap_or(i32::MAX)
}

/// Schema version recorded in the database; 0 for a new file.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read.
pub fn version(conn: &Connection) -> Result<i32, MecalError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| MecalError::Database(format!("Failed to read schema version: {e}")))
}

/// Bring the schema up to [`latest`].
///
/// # Errors
///
/// Returns an error if the database is newer than this build or a step fails.
pub fn run(conn: &mut Connection) -> Result<(), MecalError> {
    let current = version(conn)?;
    if current > latest() {
        return Err(MecalError::Database(format!(
            "database schema v{current} is newer than this mecal (v{})",
            latest()
        )));
    }

    for (index, sql) in STEPS.iter().enumerate().skip(usize::try_from(current).unwrap_or(0)) {
        let target = index + 1;
        let step = |e: rusqlite::Error| MecalError::Database(format!("Migration v{target} failed: {e}"));

        let tx = conn.transaction().map_err(step)?;
        tx.execute_batch(sql).map_err(step)?;
        tx.execute_batch(&format!("PRAGMA user_version = {target};"))
            .map_err(step)?;
        tx.commit().map_err(step)?;
        log::debug!("local database migrated to v{target}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_reaches_latest() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(version(&conn).unwrap(), 0);

        run(&mut conn).unwrap();
        assert_eq!(version(&conn).unwrap(), latest());

        conn.execute(
            "INSERT INTO sync_queue (operation_type, payload, created_at)
             VALUES ('create_memory', '{}', '2024-01-01T10:00:00Z')",
            [],
        )
        .unwrap();
        let status: String = conn
            .query_row("SELECT status FROM sync_queue", [], |row| row.get(0))
            .unwrap();
        assert_eq!(status, "pending");
    }

    #[test]
    fn test_rerun_is_a_no_op() {
        let mut conn = Connection::open_in_memory().unwrap();
        run(&mut conn).unwrap();
        run(&mut conn).unwrap();
        assert_eq!(version(&conn).unwrap(), latest());
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 99;").unwrap();
        assert!(matches!(run(&mut conn), Err(MecalError::Database(_))));
    }
}
