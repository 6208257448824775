//! Operation types for the sync queue.
//!
//! Each queued operation carries its payload as JSON text so entries written
//! by an older or newer mecal stay readable.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::{MemoryKey, NewProject, ProjectUpdate};
use crate::error::MecalError;

/// Operation types that can be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    CreateMemory,
    DeleteMemory,
    CreateProject,
    UpdateProject,
    /// A stored type this build does not know.
    #[serde(other)]
    Unknown,
}

impl OperationType {
    /// Wire name stored in the queue table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateMemory => "create_memory",
            Self::DeleteMemory => "delete_memory",
            Self::CreateProject => "create_project",
            Self::UpdateProject => "update_project",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn from_name(s: &str) -> Self {
        match s {
            "create_memory" => Self::CreateMemory,
            "delete_memory" => Self::DeleteMemory,
            "create_project" => Self::CreateProject,
            "update_project" => Self::UpdateProject,
            _ => Self::Unknown,
        }
    }

    /// Get the display name for this operation type.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::CreateMemory => "Create Memory",
            Self::DeleteMemory => "Delete Memory",
            Self::CreateProject => "Create Project",
            Self::UpdateProject => "Update Project",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Status of a queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Waiting to be replayed
    Pending,
    /// Parked after reaching the attempt limit
    Failed,
}

impl OperationStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }

    /// Parse a stored status. Unrecognized values read as pending.
    #[must_use]
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A queued operation with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Queue id, assigned on enqueue
    pub id: Option<i64>,
    pub operation_type: OperationType,
    /// JSON payload
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub status: OperationStatus,
}

impl Operation {
    /// Create a new pending operation.
    #[must_use]
    pub fn new(operation_type: OperationType, payload: String) -> Self {
        Self {
            id: None,
            operation_type,
            payload,
            created_at: Utc::now(),
            attempts: 0,
            last_attempt: None,
            last_error: None,
            status: OperationStatus::Pending,
        }
    }

    fn with_payload<T: Serialize>(
        operation_type: OperationType,
        payload: &T,
    ) -> Result<Self, MecalError> {
        Ok(Self::new(operation_type, serde_json::to_string(payload)?))
    }

    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn create_memory(key: &MemoryKey) -> Result<Self, MecalError> {
        Self::with_payload(OperationType::CreateMemory, key)
    }

    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn delete_memory(key: &MemoryKey) -> Result<Self, MecalError> {
        Self::with_payload(OperationType::DeleteMemory, key)
    }

    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn create_project(project: &NewProject) -> Result<Self, MecalError> {
        Self::with_payload(OperationType::CreateProject, project)
    }

    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn update_project(update: &ProjectUpdate) -> Result<Self, MecalError> {
        Self::with_payload(OperationType::UpdateProject, update)
    }

    /// Decode the payload.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the payload does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, MecalError> {
        serde_json::from_str(&self.payload).map_err(|e| {
            MecalError::Validation(format!("invalid {} payload: {e}", self.operation_type.as_str()))
        })
    }

    /// Whether the operation has used up `max_attempts`. `None` never exhausts.
    #[must_use]
    pub fn exhausted(&self, max_attempts: Option<u32>) -> bool {
        max_attempts.is_some_and(|max| self.attempts >= max)
    }

    /// One-line description of the payload target.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.operation_type {
            OperationType::CreateMemory | OperationType::DeleteMemory => self
                .decode::<MemoryKey>()
                .map_or_else(|_| self.payload.clone(), |k| format!("{} on {}", k.memory_type, k.project_id)),
            OperationType::CreateProject => self
                .decode::<NewProject>()
                .map_or_else(|_| self.payload.clone(), |p| p.name),
            OperationType::UpdateProject => self
                .decode::<ProjectUpdate>()
                .map_or_else(|_| self.payload.clone(), |u| u.id),
            OperationType::Unknown => self.payload.clone(),
        }
    }
}
