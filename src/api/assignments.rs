//! Memory assignment handlers.
//!
//! A memory is assigned to at most one user at a time.

use std::collections::HashMap;

use serde_json::json;

use super::{required, Api};
use crate::backend::{rows_as, Assignee, Assignment, Order, Profile, Query};
use crate::error::MecalError;

const TABLE: &str = "memory_assignments";

/// How to address an assignment for removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentKey {
    Id(String),
    MemoryUser { memory_id: String, user_id: String },
}

pub struct Assignments<'a> {
    api: &'a Api<'a>,
}

impl<'a> Assignments<'a> {
    pub(super) const fn new(api: &'a Api<'a>) -> Self {
        Self { api }
    }

    /// Assign a memory to a user, replacing any current assignee.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` without an acting user and `Validation` if
    /// either id is blank.
    pub fn assign(&self, memory_id: &str, user_id: &str) -> Result<Assignment, MecalError> {
        let Some(actor_id) = self.api.actor.user_id.as_deref() else {
            return Err(MecalError::Unauthorized(
                "an access token is required to assign memories".to_string(),
            ));
        };
        let (Some(memory_id), Some(user_id)) = (required(memory_id), required(user_id)) else {
            return Err(MecalError::validation("memory_id and user_id are required"));
        };
        let backend = self.api.backend;

        let existing: Vec<Assignment> = rows_as(backend.select(
            TABLE,
            &Query::new()
                .eq("memory_id", memory_id)
                .order("assigned_at", Order::Desc),
        )?)?;

        let patch = json!({ "user_id": user_id, "assigned_by": actor_id });
        let mut assignment: Assignment = match existing.split_first() {
            Some((latest, duplicates)) => {
                if !duplicates.is_empty() {
                    let stale = duplicates.iter().map(|a| a.id.clone());
                    if let Err(e) = backend.delete(TABLE, &Query::new().is_in("id", stale)) {
                        log::warn!("could not remove duplicate assignments of memory {memory_id}: {e}");
                    }
                }
                let rows = backend.update(TABLE, &Query::new().eq("id", latest.id.as_str()), &patch)?;
                let row = rows
                    .into_iter()
                    .next()
                    .ok_or_else(|| MecalError::NotFound(format!("assignment {}", latest.id)))?;
                serde_json::from_value(row)?
            },
            None => {
                let row = json!({
                    "memory_id": memory_id,
                    "user_id": user_id,
                    "assigned_by": actor_id,
                });
                serde_json::from_value(backend.insert(TABLE, &row)?)?
            },
        };

        self.enrich(std::slice::from_mut(&mut assignment));
        Ok(assignment)
    }

    /// Remove an assignment. Returns how many rows were deleted.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the key has blank ids.
    pub fn unassign(&self, key: &AssignmentKey) -> Result<usize, MecalError> {
        let query = match key {
            AssignmentKey::Id(id) => {
                let id = required(id).ok_or_else(|| MecalError::validation("id is required"))?;
                Query::new().eq("id", id)
            },
            AssignmentKey::MemoryUser { memory_id, user_id } => {
                let (Some(memory_id), Some(user_id)) = (required(memory_id), required(user_id))
                else {
                    return Err(MecalError::validation(
                        "id or memory_id and user_id are required",
                    ));
                };
                Query::new().eq("memory_id", memory_id).eq("user_id", user_id)
            },
        };
        Ok(self.api.backend.delete(TABLE, &query)?.len())
    }

    /// Assignments, optionally for one memory. A signed-in actor only sees
    /// their own.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the select fails.
    pub fn list(&self, memory_id: Option<&str>) -> Result<Vec<Assignment>, MecalError> {
        let mut query = Query::new().order("assigned_at", Order::Desc);
        if let Some(memory_id) = memory_id.and_then(required) {
            query = query.eq("memory_id", memory_id);
        }
        if let Some(user_id) = self.api.actor.user_id.as_deref() {
            query = query.eq("user_id", user_id);
        }

        let mut assignments: Vec<Assignment> = rows_as(self.api.backend.select(TABLE, &query)?)?;
        self.enrich(&mut assignments);
        Ok(assignments)
    }

    /// Attach assignee names. Lookup failures leave `user` unset.
    fn enrich(&self, assignments: &mut [Assignment]) {
        if assignments.is_empty() {
            return;
        }

        let mut ids: Vec<String> = assignments.iter().map(|a| a.user_id.clone()).collect();
        ids.sort();
        ids.dedup();

        let profiles = match self
            .api
            .backend
            .select("profiles", &Query::new().select("id,full_name").is_in("id", ids))
            .and_then(rows_as::<Profile>)
        {
            Ok(profiles) => profiles,
            Err(e) => {
                log::debug!("could not load assignee profiles: {e}");
                return;
            },
        };

        let names: HashMap<String, Option<String>> =
            profiles.into_iter().map(|p| (p.id, p.full_name)).collect();
        for assignment in assignments {
            if let Some(full_name) = names.get(&assignment.user_id) {
                assignment.user = Some(Assignee {
                    full_name: full_name.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Actor;
    use crate::backend::fake::FakeBackend;
    use crate::backend::Role;

    fn admin() -> Actor {
        Actor::user("admin", Some(Role::Admin))
    }

    fn with_profiles() -> FakeBackend {
        FakeBackend::new().with_rows(
            "profiles",
            vec![
                json!({"id": "u1", "full_name": "Ana Ruiz"}),
                json!({"id": "u2", "full_name": "Luis Pardo"}),
            ],
        )
    }

    #[test]
    fn test_assign_requires_actor() {
        let backend = with_profiles();
        let api = Api::new(&backend, Actor::anonymous());
        assert_eq!(api.assignments().assign("m1", "u1").unwrap_err().status_code(), 401);
        assert!(backend.rows("memory_assignments").is_empty());
    }

    #[test]
    fn test_assign_validates_ids() {
        let backend = with_profiles();
        let api = Api::new(&backend, admin());
        assert!(matches!(
            api.assignments().assign("m1", " "),
            Err(MecalError::Validation(_))
        ));
    }

    #[test]
    fn test_assign_inserts_and_enriches() {
        let backend = with_profiles();
        let api = Api::new(&backend, admin());

        let assignment = api.assignments().assign("m1", "u1").unwrap();
        assert_eq!(assignment.user_id, "u1");
        assert_eq!(assignment.assigned_by.as_deref(), Some("admin"));
        assert_eq!(
            assignment.user.and_then(|u| u.full_name).as_deref(),
            Some("Ana Ruiz")
        );
        assert_eq!(backend.rows("memory_assignments").len(), 1);
    }

    #[test]
    fn test_reassign_updates_latest_and_drops_duplicates() {
        let backend = with_profiles().with_rows(
            "memory_assignments",
            vec![
                json!({"id": "old", "memory_id": "m1", "user_id": "u1", "assigned_at": "2024-01-01T00:00:00Z"}),
                json!({"id": "new", "memory_id": "m1", "user_id": "u1", "assigned_at": "2024-02-01T00:00:00Z"}),
                json!({"id": "other", "memory_id": "m2", "user_id": "u1", "assigned_at": "2024-01-01T00:00:00Z"}),
            ],
        );
        let api = Api::new(&backend, admin());

        let assignment = api.assignments().assign("m1", "u2").unwrap();
        assert_eq!(assignment.id, "new");
        assert_eq!(assignment.user_id, "u2");

        let rows = backend.rows("memory_assignments");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r["id"] != "old"));
    }

    #[test]
    fn test_assign_survives_profile_failure() {
        let backend = FakeBackend::new();
        backend.fail_table("profiles");
        let api = Api::new(&backend, admin());

        let assignment = api.assignments().assign("m1", "u1").unwrap();
        assert!(assignment.user.is_none());
    }

    #[test]
    fn test_unassign_by_key() {
        let backend = with_profiles().with_rows(
            "memory_assignments",
            vec![
                json!({"id": "a1", "memory_id": "m1", "user_id": "u1"}),
                json!({"id": "a2", "memory_id": "m2", "user_id": "u2"}),
            ],
        );
        let api = Api::new(&backend, admin());

        assert_eq!(api.assignments().unassign(&AssignmentKey::Id("a1".into())).unwrap(), 1);
        assert_eq!(
            api.assignments()
                .unassign(&AssignmentKey::MemoryUser {
                    memory_id: "m2".into(),
                    user_id: "u2".into(),
                })
                .unwrap(),
            1
        );
        assert!(backend.rows("memory_assignments").is_empty());

        assert!(api
            .assignments()
            .unassign(&AssignmentKey::MemoryUser {
                memory_id: "m2".into(),
                user_id: String::new(),
            })
            .is_err());
    }

    #[test]
    fn test_list_scoped_to_actor() {
        let backend = with_profiles().with_rows(
            "memory_assignments",
            vec![
                json!({"id": "a1", "memory_id": "m1", "user_id": "u1"}),
                json!({"id": "a2", "memory_id": "m2", "user_id": "u2"}),
            ],
        );

        let api = Api::new(&backend, Actor::anonymous());
        assert_eq!(api.assignments().list(None).unwrap().len(), 2);
        assert_eq!(api.assignments().list(Some("m2")).unwrap().len(), 1);

        let api = Api::new(&backend, Actor::user("u1", Some(Role::Employee)));
        let mine = api.assignments().list(None).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(
            mine[0].user.as_ref().and_then(|u| u.full_name.as_deref()),
            Some("Ana Ruiz")
        );
    }
}
