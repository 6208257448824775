//! Memory handlers.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{assigned_memory_ids, required, Api, Visibility};
use crate::backend::{
    normalize_memory_type, rows_as, value_string, AuditAction, Memory, MemoryStatus, Order, Query,
};
use crate::error::MecalError;

const TABLE: &str = "project_memories";
const DEFAULT_VERSION: &str = "1.0";

/// A memory addressed by its project and type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryKey {
    pub project_id: String,
    pub memory_type: String,
}

impl MemoryKey {
    pub fn new(project_id: impl Into<String>, memory_type: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            memory_type: memory_type.into(),
        }
    }

    /// Trimmed project id and normalized type, or `Validation` if either is blank.
    fn validated(&self) -> Result<(&str, String), MecalError> {
        let memory_type = normalize_memory_type(&self.memory_type);
        match required(&self.project_id) {
            Some(project_id) if !memory_type.is_empty() => Ok((project_id, memory_type)),
            _ => Err(MecalError::validation("project_id and type are required")),
        }
    }
}

pub struct Memories<'a> {
    api: &'a Api<'a>,
}

impl<'a> Memories<'a> {
    pub(super) const fn new(api: &'a Api<'a>) -> Self {
        Self { api }
    }

    /// Memories of a project visible to the actor, types normalized.
    ///
    /// # Errors
    ///
    /// Returns `Validation` without a project id, or the backend error.
    pub fn list(&self, project_id: &str) -> Result<Vec<Memory>, MecalError> {
        let project_id =
            required(project_id).ok_or_else(|| MecalError::validation("project_id is required"))?;
        let backend = self.api.backend;

        let query = Query::new().eq("project_id", project_id).order("created_at", Order::Asc);
        let query = match self.api.actor.visibility() {
            Visibility::All => query,
            Visibility::AssignedTo(user_id) => {
                let ids = assigned_memory_ids(backend, &user_id)?;
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                query.is_in("id", ids)
            },
        };

        let memories: Vec<Memory> = rows_as(backend.select(TABLE, &query)?)?;
        Ok(memories.into_iter().map(Memory::normalized).collect())
    }

    /// Create a draft memory.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the project or type is blank.
    pub fn create(&self, key: &MemoryKey, version: Option<&str>) -> Result<Memory, MecalError> {
        let (project_id, memory_type) = key.validated()?;
        let version = version.and_then(required).unwrap_or(DEFAULT_VERSION);

        let row = json!({
            "project_id": project_id,
            "memory_type": memory_type,
            "version": version,
            "status": MemoryStatus::Draft.as_str(),
            "created_by": self.api.actor.user_id,
        });
        let memory: Memory = serde_json::from_value(self.api.backend.insert(TABLE, &row)?)?;
        let memory = memory.normalized();

        self.api.audit().record(
            TABLE,
            &memory.id,
            AuditAction::MemoryCreated,
            &json!({ "after": memory }),
        );
        Ok(memory)
    }

    /// Delete every memory of this project and type. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the project or type is blank.
    pub fn delete(&self, key: &MemoryKey) -> Result<usize, MecalError> {
        let (project_id, memory_type) = key.validated()?;

        let removed = self.api.backend.delete(
            TABLE,
            &Query::new()
                .eq("project_id", project_id)
                .eq("memory_type", memory_type.as_str()),
        )?;

        let audit = self.api.audit();
        for row in &removed {
            let id = row.get("id").and_then(value_string).unwrap_or_default();
            audit.record(TABLE, &id, AuditAction::MemoryDeleted, &json!({ "before": row }));
        }
        Ok(removed.len())
    }
}
