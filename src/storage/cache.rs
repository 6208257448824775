//! Local cache of the last-known projects and memory selections.
//!
//! Entries are JSON values keyed by name in the `cache_entries` table. A
//! corrupt entry reads as missing.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::Database;
use crate::backend::Project;
use crate::error::MecalError;

const PROJECTS_KEY: &str = "projects";
const MEMORIES_PREFIX: &str = "memories:";

/// Lightweight cached memory: only the type is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedMemory {
    #[serde(rename = "type")]
    pub memory_type: String,
}

impl CachedMemory {
    #[must_use]
    pub fn new(memory_type: impl Into<String>) -> Self {
        Self {
            memory_type: memory_type.into(),
        }
    }
}

/// Key/value cache backed by the local database.
pub struct LocalCache<'a> {
    db: &'a Database,
}

impl<'a> LocalCache<'a> {
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Last-known project list.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub fn get_projects(&self) -> Result<Option<Vec<Project>>, MecalError> {
        self.read(PROJECTS_KEY)
    }

    /// Replace the cached project list.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn set_projects(&self, projects: &[Project]) -> Result<(), MecalError> {
        self.write(PROJECTS_KEY, &projects)
    }

    /// Cached memory selection for a project. An empty id reads as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub fn get_project_memories(
        &self,
        project_id: &str,
    ) -> Result<Option<Vec<CachedMemory>>, MecalError> {
        if project_id.is_empty() {
            return Ok(None);
        }
        self.read(&memories_key(project_id))
    }

    /// Replace the cached memory selection for a project. An empty id writes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn set_project_memories(
        &self,
        project_id: &str,
        memories: &[CachedMemory],
    ) -> Result<(), MecalError> {
        if project_id.is_empty() {
            return Ok(());
        }
        self.write(&memories_key(project_id), &memories)
    }

    /// Drop every cached entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear(&self) -> Result<usize, MecalError> {
        self.db
            .connection()
            .execute("DELETE FROM cache_entries", [])
            .map_err(|e| MecalError::Database(format!("Failed to clear cache: {e}")))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, MecalError> {
        let raw: Option<String> = self
            .db
            .connection()
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| MecalError::Database(format!("Failed to read cache entry {key}: {e}")))?;

        Ok(raw.and_then(|s| match serde_json::from_str(&s) {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("cache entry {key} is unreadable: {e}");
                None
            },
        }))
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), MecalError> {
        let json = serde_json::to_string(value)?;
        self.db
            .connection()
            .execute(
                r"INSERT INTO cache_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
                  ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, json, Utc::now().to_rfc3339()],
            )
            .map_err(|e| MecalError::Database(format!("Failed to write cache entry {key}: {e}")))?;
        Ok(())
    }
}

fn memories_key(project_id: &str) -> String {
    format!("{MEMORIES_PREFIX}{project_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str, name: &str) -> Project {
        Project {
            id: id.to_string(),
            name: name.to_string(),
            cost_center: Some("HE-0001".to_string()),
            status: Some("active".to_string()),
            created_at: None,
            client_id: Some("c1".to_string()),
            memories_count: 2,
        }
    }

    #[test]
    fn test_projects_roundtrip_and_overwrite() {
        let db = Database::open_in_memory().unwrap();
        let cache = LocalCache::new(&db);

        assert!(cache.get_projects().unwrap().is_none());

        cache.set_projects(&[project("p1", "Substation")]).unwrap();
        cache
            .set_projects(&[project("p1", "Substation"), project("p2", "Plant")])
            .unwrap();

        let cached = cache.get_projects().unwrap().unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[1].name, "Plant");
    }

    #[test]
    fn test_project_memories_keyed_per_project() {
        let db = Database::open_in_memory().unwrap();
        let cache = LocalCache::new(&db);

        cache
            .set_project_memories("p1", &[CachedMemory::new("circuit")])
            .unwrap();

        assert_eq!(
            cache.get_project_memories("p1").unwrap(),
            Some(vec![CachedMemory::new("circuit")])
        );
        assert!(cache.get_project_memories("p2").unwrap().is_none());
    }

    #[test]
    fn test_empty_project_id_is_ignored() {
        let db = Database::open_in_memory().unwrap();
        let cache = LocalCache::new(&db);

        cache
            .set_project_memories("", &[CachedMemory::new("circuit")])
            .unwrap();
        assert!(cache.get_project_memories("").unwrap().is_none());

        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_corrupt_entry_reads_as_missing() {
        let db = Database::open_in_memory().unwrap();
        db.connection()
            .execute(
                "INSERT INTO cache_entries (key, value, updated_at) VALUES ('projects', '{not json', 'now')",
                [],
            )
            .unwrap();

        let cache = LocalCache::new(&db);
        assert!(cache.get_projects().unwrap().is_none());
    }

    #[test]
    fn test_cached_memory_wire_shape() {
        let json = serde_json::to_string(&CachedMemory::new("ducts")).unwrap();
        assert_eq!(json, r#"{"type":"ducts"}"#);
    }

    #[test]
    fn test_clear() {
        let db = Database::open_in_memory().unwrap();
        let cache = LocalCache::new(&db);
        cache.set_projects(&[]).unwrap();
        cache
            .set_project_memories("p1", &[CachedMemory::new("testing")])
            .unwrap();

        assert_eq!(cache.clear().unwrap(), 2);
        assert!(cache.get_projects().unwrap().is_none());
    }
}
