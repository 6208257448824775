use serde::{Deserialize, Deserializer, Serialize};

/// Memory types offered when editing a project.
pub const KNOWN_MEMORY_TYPES: [&str; 5] = ["circuit", "protection", "ducts", "installation", "testing"];

/// Normalize a memory type string: trimmed and lowercased.
#[must_use]
pub fn normalize_memory_type(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Role stored on a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Director,
    Employee,
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Admins and directors see every project and memory.
    #[must_use]
    pub const fn sees_everything(self) -> bool {
        matches!(self, Self::Admin | Self::Director)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Admin => "admin",
            Self::Director => "director",
            Self::Employee => "employee",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cost_center: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub memories_count: usize,
}

/// Lifecycle status of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStatus {
    Draft,
    InProgress,
    Completed,
}

impl MemoryStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub project_id: String,
    #[serde(default, alias = "type")]
    pub memory_type: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub version: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub created_by: Option<String>,
}

impl Memory {
    /// Return the memory with its type normalized.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.memory_type = normalize_memory_type(&self.memory_type);
        self
    }
}

/// Profile details attached to an assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignee {
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub memory_id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default)]
    pub assigned_at: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub assigned_by: Option<String>,
    #[serde(default)]
    pub user: Option<Assignee>,
}

/// Action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    MemoryCreated,
    MemoryDeleted,
    ProjectCreated,
    ProjectUpdated,
    ProjectDeleted,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(v: StringOrNumber) -> Self {
        match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

/// Ids and versions come back as strings or numbers depending on the column type.
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(d).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(d)?.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_memory_type() {
        assert_eq!(normalize_memory_type("  Circuit "), "circuit");
        assert_eq!(normalize_memory_type("PROTECTION"), "protection");
        assert_eq!(normalize_memory_type(""), "");
    }

    #[test]
    fn test_role_visibility() {
        assert!(Role::Admin.sees_everything());
        assert!(Role::Director.sees_everything());
        assert!(!Role::Employee.sees_everything());
        assert!(!Role::Unknown.sees_everything());
    }

    #[test]
    fn test_role_unknown_value() {
        let role: Role = serde_json::from_value(json!("contractor")).unwrap();
        assert_eq!(role, Role::Unknown);
    }

    #[test]
    fn test_memory_accepts_type_alias_and_numeric_version() {
        let memory: Memory = serde_json::from_value(json!({
            "id": 7,
            "project_id": "p1",
            "type": "Ducts",
            "version": 2,
            "status": "draft"
        }))
        .unwrap();

        assert_eq!(memory.id, "7");
        assert_eq!(memory.version.as_deref(), Some("2"));
        assert_eq!(memory.normalized().memory_type, "ducts");
    }

    #[test]
    fn test_project_defaults() {
        let project: Project =
            serde_json::from_value(json!({"id": "p1", "name": "Substation"})).unwrap();
        assert_eq!(project.memories_count, 0);
        assert!(project.cost_center.is_none());
        assert!(project.client_id.is_none());
    }

    #[test]
    fn test_audit_action_wire_names() {
        assert_eq!(
            serde_json::to_value(AuditAction::MemoryCreated).unwrap(),
            json!("MEMORY_CREATED")
        );
        assert_eq!(
            serde_json::to_value(AuditAction::ProjectDeleted).unwrap(),
            json!("PROJECT_DELETED")
        );
    }
}
