//! Project handlers.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use super::{assigned_memory_ids, required, Api, Visibility};
use crate::backend::{rows_as, value_string, AuditAction, Project, Query};
use crate::error::MecalError;

const TABLE: &str = "projects";
const COLUMNS: &str = "id,name,cost_center,status,created_at,client_id";
const DEFAULT_STATUS: &str = "active";

/// Fields for a new project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_center: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Partial update of a project. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// `Some(None)` clears the cost center.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub cost_center: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ProjectUpdate {
    /// A bare update for `id`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patch().is_empty()
    }

    fn patch(&self) -> Map<String, Value> {
        let mut patch = Map::new();
        if let Some(name) = self.name.as_deref().and_then(required) {
            patch.insert("name".into(), json!(name));
        }
        if let Some(client_id) = self.client_id.as_deref().and_then(required) {
            patch.insert("client_id".into(), json!(client_id));
        }
        if let Some(cost_center) = &self.cost_center {
            patch.insert("cost_center".into(), json!(cost_center));
        }
        if let Some(status) = self.status.as_deref().and_then(required) {
            patch.insert("status".into(), json!(status));
        }
        patch
    }
}

/// Distinguish an explicit `null` from a missing field.
fn present<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(d).map(Some)
}

/// Project handlers bound to an [`Api`].
pub struct Projects<'a> {
    api: &'a Api<'a>,
}

impl<'a> Projects<'a> {
    pub(super) const fn new(api: &'a Api<'a>) -> Self {
        Self { api }
    }

    /// List projects visible to the actor, each with its memory count.
    ///
    /// # Errors
    ///
    /// Returns an error if a backend query fails.
    pub fn list(&self) -> Result<Vec<Project>, MecalError> {
        let backend = self.api.backend;
        let query = Query::new().select(COLUMNS);

        let query = match self.api.actor.visibility() {
            Visibility::All => query,
            Visibility::AssignedTo(user_id) => {
                let memory_ids = assigned_memory_ids(backend, &user_id)?;
                if memory_ids.is_empty() {
                    return Ok(Vec::new());
                }

                let memories = backend.select(
                    "project_memories",
                    &Query::new().select("project_id").is_in("id", memory_ids),
                )?;
                let mut project_ids: Vec<String> = Vec::new();
                for id in memories.iter().filter_map(|m| m.get("project_id").and_then(value_string)) {
                    if !project_ids.contains(&id) {
                        project_ids.push(id);
                    }
                }
                if project_ids.is_empty() {
                    return Ok(Vec::new());
                }
                query.is_in("id", project_ids)
            },
        };

        let mut projects: Vec<Project> = rows_as(backend.select(TABLE, &query)?)?;
        self.attach_counts(&mut projects)?;
        Ok(projects)
    }

    /// Fetch one project with its memory count.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no project has this id.
    pub fn get(&self, id: &str) -> Result<Project, MecalError> {
        let id = required(id).ok_or_else(|| MecalError::validation("id is required"))?;
        let mut project = self
            .fetch(id)?
            .ok_or_else(|| MecalError::NotFound(format!("project {id}")))?;
        project.memories_count = self.count_memories(id)?;
        Ok(project)
    }

    /// Create a project.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the name or client is missing.
    pub fn create(&self, new: &NewProject) -> Result<Project, MecalError> {
        let (Some(name), Some(client_id)) = (required(&new.name), required(&new.client_id)) else {
            return Err(MecalError::validation("name and client_id are required"));
        };

        let status = new.status.as_deref().and_then(required).unwrap_or(DEFAULT_STATUS);
        let mut row = json!({ "name": name, "client_id": client_id, "status": status });
        if let Some(cost_center) = new.cost_center.as_deref().and_then(required) {
            row["cost_center"] = json!(cost_center);
        }

        let mut project: Project = serde_json::from_value(self.api.backend.insert(TABLE, &row)?)?;
        project.memories_count = 0;

        self.api.audit().record(
            TABLE,
            &project.id,
            AuditAction::ProjectCreated,
            &json!({ "after": project }),
        );
        Ok(project)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `Validation` without an id and `NotFound` if nothing matched.
    pub fn update(&self, update: &ProjectUpdate) -> Result<Project, MecalError> {
        let id = required(&update.id).ok_or_else(|| MecalError::validation("id is required"))?;
        let patch = update.patch();
        if patch.is_empty() {
            return self.get(id);
        }

        let before = self.fetch(id).unwrap_or_else(|e| {
            log::debug!("could not capture project {id} before update: {e}");
            None
        });

        let updated = self
            .api
            .backend
            .update(TABLE, &Query::new().eq("id", id), &Value::Object(patch))?;
        let row = updated
            .into_iter()
            .next()
            .ok_or_else(|| MecalError::NotFound(format!("project {id}")))?;

        let mut project: Project = serde_json::from_value(row)?;
        project.memories_count = self.count_memories(id)?;

        self.api.audit().record(
            TABLE,
            &project.id,
            AuditAction::ProjectUpdated,
            &json!({ "before": before, "after": project }),
        );
        Ok(project)
    }

    /// Delete a project and its memories.
    ///
    /// # Errors
    ///
    /// Returns an error if the project delete fails.
    pub fn delete(&self, id: &str) -> Result<(), MecalError> {
        let id = required(id).ok_or_else(|| MecalError::validation("id is required"))?;
        let backend = self.api.backend;

        let before = self.fetch(id).unwrap_or_else(|e| {
            log::debug!("could not capture project {id} before delete: {e}");
            None
        });

        if let Err(e) = backend.delete("project_memories", &Query::new().eq("project_id", id)) {
            log::warn!("failed to delete memories of project {id}: {e}");
        }
        backend.delete(TABLE, &Query::new().eq("id", id))?;

        self.api.audit().record(
            TABLE,
            id,
            AuditAction::ProjectDeleted,
            &json!({ "before": before }),
        );
        Ok(())
    }

    fn fetch(&self, id: &str) -> Result<Option<Project>, MecalError> {
        let rows = self
            .api
            .backend
            .select(TABLE, &Query::new().select(COLUMNS).eq("id", id))?;
        Ok(rows_as::<Project>(rows)?.into_iter().next())
    }

    fn count_memories(&self, project_id: &str) -> Result<usize, MecalError> {
        let rows = self.api.backend.select(
            "project_memories",
            &Query::new().select("id").eq("project_id", project_id),
        )?;
        Ok(rows.len())
    }

    fn attach_counts(&self, projects: &mut [Project]) -> Result<(), MecalError> {
        if projects.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = projects.iter().map(|p| p.id.clone()).collect();
        let rows = self.api.backend.select(
            "project_memories",
            &Query::new().select("id,project_id").is_in("project_id", ids),
        )?;

        let mut counts: HashMap<String, usize> = HashMap::new();
        for project_id in rows.iter().filter_map(|r| r.get("project_id").and_then(value_string)) {
            *counts.entry(project_id).or_default() += 1;
        }
        for project in projects {
            project.memories_count = counts.get(&project.id).copied().unwrap_or(0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Actor;
    use crate::backend::fake::FakeBackend;
    use crate::backend::Role;

    fn seeded() -> FakeBackend {
        FakeBackend::new()
            .with_rows(
                "projects",
                vec![
                    json!({"id": "p1", "name": "Substation", "client_id": "c1", "status": "active"}),
                    json!({"id": "p2", "name": "Plant", "client_id": "c1", "cost_center": "HE-0002"}),
                ],
            )
            .with_rows(
                "project_memories",
                vec![
                    json!({"id": "m1", "project_id": "p1", "memory_type": "circuit"}),
                    json!({"id": "m2", "project_id": "p1", "memory_type": "protection"}),
                    json!({"id": "m3", "project_id": "p2", "memory_type": "ducts"}),
                ],
            )
            .with_rows(
                "memory_assignments",
                vec![json!({"id": "a1", "memory_id": "m2", "user_id": "emp"})],
            )
    }

    #[test]
    fn test_list_all_with_counts() {
        let backend = seeded();
        let api = Api::new(&backend, Actor::anonymous());

        let projects = api.projects().list().unwrap();
        assert_eq!(projects.len(), 2);
        let p1 = projects.iter().find(|p| p.id == "p1").unwrap();
        let p2 = projects.iter().find(|p| p.id == "p2").unwrap();
        assert_eq!(p1.memories_count, 2);
        assert_eq!(p2.memories_count, 1);
        assert_eq!(p2.cost_center.as_deref(), Some("HE-0002"));
    }

    #[test]
    fn test_list_scoped_to_assignments() {
        let backend = seeded();
        let api = Api::new(&backend, Actor::user("emp", Some(Role::Employee)));

        let projects = api.projects().list().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "p1");
        // Count covers every memory of the project, not only assigned ones
        assert_eq!(projects[0].memories_count, 2);
    }

    #[test]
    fn test_list_scoped_without_assignments_is_empty() {
        let backend = seeded();
        let api = Api::new(&backend, Actor::user("nobody", Some(Role::Employee)));
        assert!(api.projects().list().unwrap().is_empty());
    }

    #[test]
    fn test_list_director_sees_everything() {
        let backend = seeded();
        let api = Api::new(&backend, Actor::user("boss", Some(Role::Director)));
        assert_eq!(api.projects().list().unwrap().len(), 2);
    }

    #[test]
    fn test_get_not_found() {
        let backend = seeded();
        let api = Api::new(&backend, Actor::anonymous());
        assert!(matches!(
            api.projects().get("missing"),
            Err(MecalError::NotFound(_))
        ));
        assert_eq!(api.projects().get("p1").unwrap().memories_count, 2);
    }

    #[test]
    fn test_create_validates_and_defaults() {
        let backend = FakeBackend::new();
        let api = Api::new(&backend, Actor::anonymous());

        let err = api
            .projects()
            .create(&NewProject {
                name: "  ".to_string(),
                client_id: "c1".to_string(),
                cost_center: None,
                status: None,
            })
            .unwrap_err();
        assert_eq!(err.status_code(), 400);

        let project = api
            .projects()
            .create(&NewProject {
                name: "Substation".to_string(),
                client_id: "c1".to_string(),
                cost_center: Some(String::new()),
                status: None,
            })
            .unwrap();

        assert_eq!(project.status.as_deref(), Some("active"));
        assert!(project.cost_center.is_none());
        assert_eq!(project.memories_count, 0);

        let stored = backend.rows("projects");
        assert!(stored[0].get("cost_center").is_none());

        let audit = backend.rows("audit_logs");
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0]["action"], "PROJECT_CREATED");
    }

    #[test]
    fn test_create_survives_audit_failure() {
        let backend = FakeBackend::new();
        backend.fail_table("audit_logs");
        let api = Api::new(&backend, Actor::anonymous());

        let project = api
            .projects()
            .create(&NewProject {
                name: "Plant".to_string(),
                client_id: "c1".to_string(),
                cost_center: Some("HE-0009".to_string()),
                status: Some("planning".to_string()),
            })
            .unwrap();
        assert_eq!(project.cost_center.as_deref(), Some("HE-0009"));
        assert_eq!(project.status.as_deref(), Some("planning"));
    }

    #[test]
    fn test_update_patches_only_given_fields() {
        let backend = seeded();
        let api = Api::new(&backend, Actor::anonymous());

        let project = api
            .projects()
            .update(&ProjectUpdate {
                id: "p2".to_string(),
                name: Some("Power Plant".to_string()),
                cost_center: Some(None),
                ..ProjectUpdate::default()
            })
            .unwrap();

        assert_eq!(project.name, "Power Plant");
        assert!(project.cost_center.is_none());
        assert_eq!(project.client_id.as_deref(), Some("c1"));
        assert_eq!(project.memories_count, 1);

        let audit = backend.rows("audit_logs");
        let changes: Value = serde_json::from_str(audit[0]["changes"].as_str().unwrap()).unwrap();
        assert_eq!(changes["before"]["name"], "Plant");
        assert_eq!(changes["after"]["name"], "Power Plant");
    }

    #[test]
    fn test_update_requires_id_and_existing_row() {
        let backend = seeded();
        let api = Api::new(&backend, Actor::anonymous());

        assert_eq!(
            api.projects()
                .update(&ProjectUpdate::default())
                .unwrap_err()
                .status_code(),
            400
        );
        assert!(matches!(
            api.projects().update(&ProjectUpdate {
                id: "missing".to_string(),
                name: Some("x".to_string()),
                ..ProjectUpdate::default()
            }),
            Err(MecalError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_payload_distinguishes_null_from_missing() {
        let cleared: ProjectUpdate =
            serde_json::from_value(json!({"id": "p1", "cost_center": null})).unwrap();
        assert_eq!(cleared.cost_center, Some(None));

        let untouched: ProjectUpdate = serde_json::from_value(json!({"id": "p1"})).unwrap();
        assert_eq!(untouched.cost_center, None);
    }

    #[test]
    fn test_delete_removes_memories_first() {
        let backend = seeded();
        let api = Api::new(&backend, Actor::anonymous());

        api.projects().delete("p1").unwrap();

        assert_eq!(backend.rows("projects").len(), 1);
        let memories = backend.rows("project_memories");
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0]["project_id"], "p2");
        assert_eq!(backend.rows("audit_logs")[0]["action"], "PROJECT_DELETED");
    }
}
