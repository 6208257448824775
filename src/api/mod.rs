//! Request handlers over the backend.
//!
//! Handlers validate input, normalize memory types, apply role-based
//! visibility and write the audit trail. They hold no state of their own.

mod actor;
mod assignments;
mod audit;
mod directory;
mod memories;
mod projects;

use crate::backend::{value_string, Backend, Query};
use crate::error::MecalError;

pub use actor::{Actor, Visibility};
pub use assignments::{AssignmentKey, Assignments};
pub use audit::{request_id, AuditLog};
pub use directory::Directory;
pub use memories::{Memories, MemoryKey};
pub use projects::{NewProject, ProjectUpdate, Projects};

/// Entry point to the handlers for one actor.
pub struct Api<'a> {
    backend: &'a dyn Backend,
    actor: Actor,
}

impl<'a> Api<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn Backend, actor: Actor) -> Self {
        Self { backend, actor }
    }

    #[must_use]
    pub const fn actor(&self) -> &Actor {
        &self.actor
    }

    #[must_use]
    pub const fn projects(&self) -> Projects<'_> {
        Projects::new(self)
    }

    #[must_use]
    pub const fn memories(&self) -> Memories<'_> {
        Memories::new(self)
    }

    #[must_use]
    pub const fn assignments(&self) -> Assignments<'_> {
        Assignments::new(self)
    }

    #[must_use]
    pub const fn directory(&self) -> Directory<'_> {
        Directory::new(self)
    }

    fn audit(&self) -> AuditLog<'_> {
        AuditLog::new(self.backend, self.actor.user_id.as_deref())
    }
}

/// Trimmed value, or `None` if blank.
fn required(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Ids of every memory assigned to `user_id`.
fn assigned_memory_ids(backend: &dyn Backend, user_id: &str) -> Result<Vec<String>, MecalError> {
    let rows = backend.select(
        "memory_assignments",
        &Query::new().select("memory_id").eq("user_id", user_id),
    )?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get("memory_id").and_then(value_string))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use serde_json::json;

    #[test]
    fn test_required() {
        assert_eq!(required("  p1 "), Some("p1"));
        assert_eq!(required("   "), None);
        assert_eq!(required(""), None);
    }

    #[test]
    fn test_assigned_memory_ids() {
        let backend = FakeBackend::new().with_rows(
            "memory_assignments",
            vec![
                json!({"id": "a1", "memory_id": "m1", "user_id": "u1"}),
                json!({"id": "a2", "memory_id": 5, "user_id": "u1"}),
                json!({"id": "a3", "memory_id": "m3", "user_id": "u2"}),
            ],
        );
        assert_eq!(assigned_memory_ids(&backend, "u1").unwrap(), vec!["m1", "5"]);
        assert!(assigned_memory_ids(&backend, "nobody").unwrap().is_empty());
    }
}
