//! `SQLite` database connection.
//!
//! One file, `mecal.db` under the data root, holds the sync operation queue
//! and the local cache.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::MecalError;

use super::migrations;

/// How long a write waits for another mecal process holding the file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Migrated connection to the local database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or migrations fail.
    pub fn open_at(path: &Path) -> Result<Self, MecalError> {
        let conn = Connection::open(path).map_err(|e| {
            MecalError::Database(format!("Failed to open database {}: {e}", path.display()))
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| MecalError::Database(format!("Failed to set busy timeout: {e}")))?;
        Self::migrated(conn)
    }

    /// Open a throwaway in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub fn open_in_memory() -> Result<Self, MecalError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            MecalError::Database(format!("Failed to open in-memory database: {e}"))
        })?;
        Self::migrated(conn)
    }

    fn migrated(mut conn: Connection) -> Result<Self, MecalError> {
        migrations::run(&mut conn)?;
        Ok(Self { conn })
    }

    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, MecalError> {
        migrations::version(&self.conn)
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
