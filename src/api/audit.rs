//! Best-effort audit trail.
//!
//! Every mutation writes one row to `audit_logs`. A failed write is logged
//! and otherwise ignored.

use chrono::Utc;
use serde_json::{json, Value};

use crate::backend::{AuditAction, Backend};

const AUDIT_TABLE: &str = "audit_logs";

/// Generate a request id of the form `<unix millis>-<8 hex chars>`.
#[must_use]
pub fn request_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Audit writer bound to one acting user.
pub struct AuditLog<'a> {
    backend: &'a dyn Backend,
    user_id: Option<&'a str>,
}

impl<'a> AuditLog<'a> {
    #[must_use]
    pub const fn new(backend: &'a dyn Backend, user_id: Option<&'a str>) -> Self {
        Self { backend, user_id }
    }

    /// Record an action on `table`/`record_id`. `changes` is stored as JSON text.
    pub fn record(&self, table: &str, record_id: &str, action: AuditAction, changes: &Value) {
        let entry = json!({
            "table_name": table,
            "record_id": record_id,
            "action": action,
            "user_id": self.user_id,
            "changes": changes.to_string(),
            "source": format!("api.{table}"),
            "request_id": request_id(),
        });

        if let Err(e) = self.backend.insert(AUDIT_TABLE, &entry) {
            log::debug!("failed to write audit log for {table}/{record_id} ({action:?}): {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;

    #[test]
    fn test_request_id_shape() {
        let id = request_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_record_writes_entry() {
        let backend = FakeBackend::new();
        let audit = AuditLog::new(&backend, Some("u1"));

        audit.record(
            "projects",
            "p1",
            AuditAction::ProjectCreated,
            &json!({"after": {"id": "p1"}}),
        );

        let rows = backend.rows("audit_logs");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["action"], "PROJECT_CREATED");
        assert_eq!(rows[0]["source"], "api.projects");
        assert_eq!(rows[0]["user_id"], "u1");
        assert_eq!(rows[0]["changes"], r#"{"after":{"id":"p1"}}"#);
    }

    #[test]
    fn test_record_failure_is_swallowed() {
        let backend = FakeBackend::new();
        backend.fail_table("audit_logs");

        AuditLog::new(&backend, None).record(
            "project_memories",
            "m1",
            AuditAction::MemoryDeleted,
            &json!({}),
        );
        assert!(backend.rows("audit_logs").is_empty());
    }
}
