//! Sync queue storage and management.
//!
//! Operations are replayed in insertion order, so every listing here is
//! ordered by queue id.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::operation::{Operation, OperationStatus, OperationType};
use crate::api::MemoryKey;
use crate::backend::normalize_memory_type;
use crate::error::MecalError;
use crate::storage::Database;

const COLUMNS: &str = "id, operation_type, payload, created_at, attempts, last_attempt, last_error, status";

/// Persistent queue of pending operations.
pub struct SyncQueue<'a> {
    db: &'a Database,
}

impl<'a> SyncQueue<'a> {
    #[must_use]
    pub const fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Append an operation and assign its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation cannot be saved.
    pub fn enqueue(&self, operation: &mut Operation) -> Result<i64, MecalError> {
        let conn = self.db.connection();

        conn.execute(
            r"INSERT INTO sync_queue (operation_type, payload, created_at, attempts, status)
              VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                operation.operation_type.as_str(),
                operation.payload,
                operation.created_at.to_rfc3339(),
                operation.attempts,
                operation.status.as_str(),
            ],
        )
        .map_err(|e| MecalError::Database(format!("Failed to enqueue operation: {e}")))?;

        let id = conn.last_insert_rowid();
        operation.id = Some(id);
        log::debug!("queued {} #{id}: {}", operation.operation_type.as_str(), operation.payload);
        Ok(id)
    }

    /// Pending operations in queue order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_pending(&self, limit: Option<usize>) -> Result<Vec<Operation>, MecalError> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.and_then(|l| i64::try_from(l).ok()).unwrap_or(-1);
        self.query(
            &format!("SELECT {COLUMNS} FROM sync_queue WHERE status = 'pending' ORDER BY id ASC LIMIT ?1"),
            params![limit],
        )
    }

    /// All operations with a given status, in queue order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_by_status(&self, status: OperationStatus) -> Result<Vec<Operation>, MecalError> {
        self.query(
            &format!("SELECT {COLUMNS} FROM sync_queue WHERE status = ?1 ORDER BY id ASC"),
            params![status.as_str()],
        )
    }

    /// Every queued operation regardless of status.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_all(&self) -> Result<Vec<Operation>, MecalError> {
        self.query(&format!("SELECT {COLUMNS} FROM sync_queue ORDER BY id ASC"), [])
    }

    /// Get a specific operation by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get(&self, id: i64) -> Result<Option<Operation>, MecalError> {
        self.db
            .connection()
            .query_row(
                &format!("SELECT {COLUMNS} FROM sync_queue WHERE id = ?1"),
                [id],
                row_to_operation,
            )
            .optional()
            .map_err(|e| MecalError::Database(format!("Failed to query operation: {e}")))
    }

    /// Overwrite a stored operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn update(&self, operation: &Operation) -> Result<(), MecalError> {
        self.db
            .connection()
            .execute(
                r"UPDATE sync_queue SET
                  operation_type = ?1,
                  payload = ?2,
                  attempts = ?3,
                  last_attempt = ?4,
                  last_error = ?5,
                  status = ?6
                  WHERE id = ?7",
                params![
                    operation.operation_type.as_str(),
                    operation.payload,
                    operation.attempts,
                    operation.last_attempt.map(|t| t.to_rfc3339()),
                    operation.last_error,
                    operation.status.as_str(),
                    operation.id,
                ],
            )
            .map_err(|e| MecalError::Database(format!("Failed to update operation: {e}")))?;
        Ok(())
    }

    /// Remove an applied or abandoned operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn remove(&self, id: i64) -> Result<bool, MecalError> {
        let rows = self
            .db
            .connection()
            .execute("DELETE FROM sync_queue WHERE id = ?1", [id])
            .map_err(|e| MecalError::Database(format!("Failed to delete operation: {e}")))?;
        Ok(rows > 0)
    }

    /// Count a failed attempt and keep the operation pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn record_attempt(&self, id: i64, error: &str) -> Result<(), MecalError> {
        self.db
            .connection()
            .execute(
                r"UPDATE sync_queue SET
                  last_attempt = ?1,
                  last_error = ?2,
                  attempts = attempts + 1
                  WHERE id = ?3",
                params![Utc::now().to_rfc3339(), error, id],
            )
            .map_err(|e| MecalError::Database(format!("Failed to record attempt: {e}")))?;
        Ok(())
    }

    /// Park an operation so sync no longer replays it.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub fn mark_failed(&self, id: i64, error: &str) -> Result<(), MecalError> {
        self.db
            .connection()
            .execute(
                r"UPDATE sync_queue SET
                  status = 'failed',
                  last_attempt = ?1,
                  last_error = ?2
                  WHERE id = ?3",
                params![Utc::now().to_rfc3339(), error, id],
            )
            .map_err(|e| MecalError::Database(format!("Failed to mark operation failed: {e}")))?;
        Ok(())
    }

    /// Move parked operations back to pending with a fresh attempt count.
    /// `None` requeues every failed operation.
    ///
    /// A parked memory operation that a later pending operation on the same
    /// memory supersedes is dropped instead, so it cannot replay after the
    /// newer one. Returns how many operations were requeued or dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read or updated.
    pub fn requeue(&self, id: Option<i64>) -> Result<usize, MecalError> {
        let mut dropped = 0;
        for op_id in self.superseded_memory_operations()? {
            if id.map_or(true, |id| id == op_id) && self.remove(op_id)? {
                log::info!("dropped parked operation #{op_id}: superseded by a later change");
                dropped += 1;
            }
        }

        let conn = self.db.connection();
        let sql = "UPDATE sync_queue SET status = 'pending', attempts = 0 WHERE status = 'failed'";
        let rows = match id {
            Some(id) => conn.execute(&format!("{sql} AND id = ?1"), [id]),
            None => conn.execute(sql, []),
        }
        .map_err(|e| MecalError::Database(format!("Failed to requeue operations: {e}")))?;
        Ok(rows + dropped)
    }

    /// Ids of parked memory operations with a later pending operation on the
    /// same project and memory type.
    fn superseded_memory_operations(&self) -> Result<Vec<i64>, MecalError> {
        let pending: Vec<(i64, MemoryKey)> = self
            .get_pending(None)?
            .iter()
            .filter_map(memory_target)
            .collect();

        Ok(self
            .get_by_status(OperationStatus::Failed)?
            .iter()
            .filter_map(memory_target)
            .filter(|(id, key)| pending.iter().any(|(later, k)| later > id && k == key))
            .map(|(id, _)| id)
            .collect())
    }

    /// Get queue statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn stats(&self) -> Result<QueueStats, MecalError> {
        let conn = self.db.connection();

        let (pending, failed): (i64, i64) = conn
            .query_row(
                r"SELECT
                    COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0)
                  FROM sync_queue",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| MecalError::Database(format!("Failed to count operations: {e}")))?;

        let oldest_pending: Option<String> = conn
            .query_row(
                "SELECT created_at FROM sync_queue WHERE status = 'pending' ORDER BY id ASC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| MecalError::Database(format!("Failed to get oldest pending: {e}")))?;

        Ok(QueueStats {
            pending,
            failed,
            oldest_pending: oldest_pending.as_deref().and_then(parse_time),
        })
    }

    /// Check if there are any pending operations.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn has_pending(&self) -> Result<bool, MecalError> {
        Ok(self.stats()?.pending > 0)
    }

    /// Drop every queued operation. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn clear(&self) -> Result<usize, MecalError> {
        self.db
            .connection()
            .execute("DELETE FROM sync_queue", [])
            .map_err(|e| MecalError::Database(format!("Failed to clear queue: {e}")))
    }

    fn query<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Operation>, MecalError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| MecalError::Database(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params, row_to_operation)
            .map_err(|e| MecalError::Database(format!("Failed to query operations: {e}")))?;

        let mut operations = Vec::new();
        for row in rows {
            operations.push(row.map_err(|e| MecalError::Database(e.to_string()))?);
        }
        Ok(operations)
    }
}

/// Queue statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStats {
    pub pending: i64,
    pub failed: i64,
    /// Creation time of the next operation to replay
    pub oldest_pending: Option<DateTime<Utc>>,
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .ok()
}

/// Queue id and normalized target of a memory operation.
fn memory_target(operation: &Operation) -> Option<(i64, MemoryKey)> {
    match operation.operation_type {
        OperationType::CreateMemory | OperationType::DeleteMemory => {},
        _ => return None,
    }
    let key = operation.decode::<MemoryKey>().ok()?;
    Some((
        operation.id?,
        MemoryKey::new(key.project_id.trim(), normalize_memory_type(&key.memory_type)),
    ))
}

fn row_to_operation(row: &Row<'_>) -> Result<Operation, rusqlite::Error> {
    let operation_type: String = row.get(1)?;
    let created_at: String = row.get(3)?;
    let last_attempt: Option<String> = row.get(5)?;
    let status: String = row.get(7)?;

    Ok(Operation {
        id: Some(row.get(0)?),
        operation_type: OperationType::from_name(&operation_type),
        payload: row.get(2)?,
        created_at: parse_time(&created_at).unwrap_or_else(Utc::now),
        attempts: row.get(4)?,
        last_attempt: last_attempt.as_deref().and_then(parse_time),
        last_error: row.get(6)?,
        status: OperationStatus::from_name(&status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_op(project_id: &str, memory_type: &str) -> Operation {
        Operation::create_memory(&MemoryKey::new(project_id, memory_type)).unwrap()
    }

    #[test]
    fn test_enqueue_and_get() {
        let db = Database::open_in_memory().unwrap();
        let queue = SyncQueue::new(&db);

        let mut op = memory_op("p1", "circuit");
        let id = queue.enqueue(&mut op).unwrap();
        assert_eq!(op.id, Some(id));

        let loaded = queue.get(id).unwrap().unwrap();
        assert_eq!(loaded.operation_type, OperationType::CreateMemory);
        assert_eq!(loaded.status, OperationStatus::Pending);
        assert_eq!(loaded.payload, op.payload);
        assert!(queue.get(id + 100).unwrap().is_none());
    }

    #[test]
    fn test_get_pending_is_fifo() {
        let db = Database::open_in_memory().unwrap();
        let queue = SyncQueue::new(&db);

        let mut create = memory_op("p1", "circuit");
        let mut delete = Operation::delete_memory(&MemoryKey::new("p1", "circuit")).unwrap();
        let mut again = memory_op("p1", "ducts");
        queue.enqueue(&mut create).unwrap();
        queue.enqueue(&mut delete).unwrap();
        queue.enqueue(&mut again).unwrap();

        let pending = queue.get_pending(None).unwrap();
        let types: Vec<_> = pending.iter().map(|op| op.operation_type).collect();
        assert_eq!(
            types,
            vec![
                OperationType::CreateMemory,
                OperationType::DeleteMemory,
                OperationType::CreateMemory
            ]
        );

        assert_eq!(queue.get_pending(Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_stored_type_is_preserved_as_unknown() {
        let db = Database::open_in_memory().unwrap();
        db.connection()
            .execute(
                "INSERT INTO sync_queue (operation_type, payload, created_at) VALUES ('archive_project', '{}', 'garbage')",
                [],
            )
            .unwrap();

        let pending = SyncQueue::new(&db).get_pending(None).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].operation_type, OperationType::Unknown);
        assert_eq!(pending[0].attempts, 0);
    }

    #[test]
    fn test_record_attempt_keeps_pending() {
        let db = Database::open_in_memory().unwrap();
        let queue = SyncQueue::new(&db);

        let id = queue.enqueue(&mut memory_op("p1", "circuit")).unwrap();
        queue.record_attempt(id, "timeout").unwrap();
        queue.record_attempt(id, "503").unwrap();

        let loaded = queue.get(id).unwrap().unwrap();
        assert_eq!(loaded.status, OperationStatus::Pending);
        assert_eq!(loaded.attempts, 2);
        assert_eq!(loaded.last_error.as_deref(), Some("503"));
        assert!(loaded.last_attempt.is_some());
    }

    #[test]
    fn test_mark_failed_and_requeue() {
        let db = Database::open_in_memory().unwrap();
        let queue = SyncQueue::new(&db);

        let a = queue.enqueue(&mut memory_op("p1", "circuit")).unwrap();
        let b = queue.enqueue(&mut memory_op("p1", "ducts")).unwrap();
        queue.record_attempt(a, "boom").unwrap();
        queue.mark_failed(a, "boom").unwrap();
        queue.mark_failed(b, "boom").unwrap();

        assert!(queue.get_pending(None).unwrap().is_empty());
        assert_eq!(queue.get_by_status(OperationStatus::Failed).unwrap().len(), 2);

        assert_eq!(queue.requeue(Some(a)).unwrap(), 1);
        let loaded = queue.get(a).unwrap().unwrap();
        assert_eq!(loaded.status, OperationStatus::Pending);
        assert_eq!(loaded.attempts, 0);

        assert_eq!(queue.requeue(None).unwrap(), 1);
        assert_eq!(queue.get_pending(None).unwrap().len(), 2);
    }

    #[test]
    fn test_requeue_drops_superseded_memory_operations() {
        let db = Database::open_in_memory().unwrap();
        let queue = SyncQueue::new(&db);

        let parked = queue.enqueue(&mut memory_op("p1", "circuit")).unwrap();
        let other = queue.enqueue(&mut memory_op("p1", "ducts")).unwrap();
        queue.mark_failed(parked, "boom").unwrap();
        queue.mark_failed(other, "boom").unwrap();

        // The user toggled circuit off and on again while the create was parked
        let mut delete = Operation::delete_memory(&MemoryKey::new("p1", "Circuit")).unwrap();
        queue.enqueue(&mut delete).unwrap();
        queue.enqueue(&mut memory_op("p1", "circuit")).unwrap();

        assert_eq!(queue.requeue(Some(parked)).unwrap(), 1);
        assert!(queue.get(parked).unwrap().is_none());

        assert_eq!(queue.requeue(None).unwrap(), 1);
        let pending = queue.get_pending(None).unwrap();
        let creates_of_circuit = pending
            .iter()
            .filter(|op| {
                op.operation_type == OperationType::CreateMemory
                    && op.decode::<MemoryKey>().unwrap().memory_type == "circuit"
            })
            .count();
        assert_eq!(creates_of_circuit, 1);
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].id, Some(other));
    }

    #[test]
    fn test_stats_and_clear() {
        let db = Database::open_in_memory().unwrap();
        let queue = SyncQueue::new(&db);

        let empty = queue.stats().unwrap();
        assert_eq!(empty.pending, 0);
        assert!(empty.oldest_pending.is_none());
        assert!(!queue.has_pending().unwrap());

        let mut first = memory_op("p1", "circuit");
        queue.enqueue(&mut first).unwrap();
        let second = queue.enqueue(&mut memory_op("p2", "ducts")).unwrap();
        queue.mark_failed(second, "boom").unwrap();

        let stats = queue.stats().unwrap();
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(
            stats.oldest_pending.map(|t| t.timestamp()),
            Some(first.created_at.timestamp())
        );
        assert!(queue.has_pending().unwrap());

        assert_eq!(queue.clear().unwrap(), 2);
        assert!(queue.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_update_and_remove() {
        let db = Database::open_in_memory().unwrap();
        let queue = SyncQueue::new(&db);

        let mut op = memory_op("p1", "circuit");
        let id = queue.enqueue(&mut op).unwrap();
        op.payload = r#"{"project_id":"p1","memory_type":"testing"}"#.to_string();
        queue.update(&op).unwrap();
        assert_eq!(queue.get(id).unwrap().unwrap().summary(), "testing on p1");

        assert!(queue.remove(id).unwrap());
        assert!(!queue.remove(id).unwrap());
    }
}
