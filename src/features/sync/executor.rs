//! Sync executor for replaying queued operations.
//!
//! Operations are replayed one at a time in queue order. An applied
//! operation leaves the queue; a failed one stays queued with its attempt
//! count raised and is retried on the next run.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use serde::Serialize;

use super::operation::{Operation, OperationType};
use super::queue::SyncQueue;
use crate::api::{Api, MemoryKey, NewProject, ProjectUpdate};
use crate::error::MecalError;

/// Remote side of a sync run.
#[cfg_attr(test, mockall::automock)]
pub trait SyncTarget {
    fn create_memory(&self, key: &MemoryKey) -> Result<(), MecalError>;
    fn delete_memory(&self, key: &MemoryKey) -> Result<(), MecalError>;
    fn create_project(&self, project: &NewProject) -> Result<(), MecalError>;
    fn update_project(&self, update: &ProjectUpdate) -> Result<(), MecalError>;
}

impl SyncTarget for Api<'_> {
    fn create_memory(&self, key: &MemoryKey) -> Result<(), MecalError> {
        self.memories().create(key, None).map(|_| ())
    }

    fn delete_memory(&self, key: &MemoryKey) -> Result<(), MecalError> {
        self.memories().delete(key).map(|_| ())
    }

    fn create_project(&self, project: &NewProject) -> Result<(), MecalError> {
        self.projects().create(project).map(|_| ())
    }

    fn update_project(&self, update: &ProjectUpdate) -> Result<(), MecalError> {
        self.projects().update(update).map(|_| ())
    }
}

/// Guards against overlapping sync runs.
pub struct SyncLock {
    running: AtomicBool,
}

static PROCESS_LOCK: SyncLock = SyncLock::new();

impl SyncLock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// The lock shared by every executor in this process.
    #[must_use]
    pub fn process() -> &'static Self {
        &PROCESS_LOCK
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<SyncGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncGuard { lock: self })
    }
}

impl Default for SyncLock {
    fn default() -> Self {
        Self::new()
    }
}

struct SyncGuard<'a> {
    lock: &'a SyncLock,
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.lock.running.store(false, Ordering::Release);
    }
}

/// Whether a sync run is in progress in this process.
#[must_use]
pub fn is_syncing() -> bool {
    SyncLock::process().is_held()
}

/// Configuration for the sync executor.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Park an operation as failed once it has this many attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Stop at the first failure
    pub stop_on_error: bool,
    /// Report what would run without touching the queue or the backend
    pub dry_run: bool,
}

impl From<&crate::config::SyncConfig> for ExecutorConfig {
    fn from(config: &crate::config::SyncConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            stop_on_error: config.stop_on_error,
            dry_run: false,
        }
    }
}

/// Result of replaying a single operation.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub id: i64,
    pub operation_type: OperationType,
    pub success: bool,
    pub error: Option<String>,
    pub skipped: bool,
    /// The operation reached the attempt limit and was parked
    pub parked: bool,
}

impl ExecutionResult {
    fn applied(operation: &Operation) -> Self {
        Self {
            id: operation.id.unwrap_or_default(),
            operation_type: operation.operation_type,
            success: true,
            error: None,
            skipped: false,
            parked: false,
        }
    }

    fn failed(operation: &Operation, error: String, parked: bool) -> Self {
        Self {
            success: false,
            error: Some(error),
            parked,
            ..Self::applied(operation)
        }
    }

    fn skipped(operation: &Operation) -> Self {
        Self {
            skipped: true,
            ..Self::applied(operation)
        }
    }
}

/// Progress report handed to the caller after each operation.
#[derive(Debug)]
pub struct SyncProgress<'p> {
    /// Zero-based position in this run
    pub index: usize,
    pub total: usize,
    pub operation: &'p Operation,
    pub result: &'p ExecutionResult,
}

/// Result of a sync run.
#[derive(Debug, Default, Serialize)]
pub struct SyncResult {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<ExecutionResult>,
    /// Operations still pending after the run
    pub remaining: Vec<Operation>,
}

impl SyncResult {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn add(&mut self, result: ExecutionResult) {
        if result.skipped {
            self.skipped += 1;
        } else if result.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    /// Nothing failed and nothing is left to replay.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.failed == 0 && self.remaining.is_empty()
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

/// Executor for draining the sync queue.
pub struct SyncExecutor<'a> {
    target: &'a dyn SyncTarget,
    queue: &'a SyncQueue<'a>,
    lock: &'a SyncLock,
    config: ExecutorConfig,
}

impl<'a> SyncExecutor<'a> {
    #[must_use]
    pub fn new(target: &'a dyn SyncTarget, queue: &'a SyncQueue<'a>) -> Self {
        Self::with_config(target, queue, ExecutorConfig::default())
    }

    #[must_use]
    pub fn with_config(
        target: &'a dyn SyncTarget,
        queue: &'a SyncQueue<'a>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            target,
            queue,
            lock: SyncLock::process(),
            config,
        }
    }

    /// Use a private lock instead of the process-wide one.
    #[must_use]
    pub fn with_lock(mut self, lock: &'a SyncLock) -> Self {
        self.lock = lock;
        self
    }

    /// Replay every pending operation.
    ///
    /// # Errors
    ///
    /// Returns `AlreadySyncing` if another run holds the lock, or an error if
    /// the queue cannot be read or updated.
    pub fn execute_all<F>(&self, mut on_progress: F) -> Result<SyncResult, MecalError>
    where
        F: FnMut(&SyncProgress<'_>),
    {
        let Some(_guard) = self.lock.try_acquire() else {
            return Err(MecalError::AlreadySyncing);
        };

        let pending = self.queue.get_pending(None)?;
        let total = pending.len();
        let mut result = SyncResult::empty();

        for (index, operation) in pending.iter().enumerate() {
            let op_result = self.execute_one(operation)?;
            on_progress(&SyncProgress {
                index,
                total,
                operation,
                result: &op_result,
            });

            let should_stop = !op_result.success && self.config.stop_on_error;
            result.add(op_result);
            if should_stop {
                break;
            }
        }

        result.remaining = self.queue.get_pending(None)?;
        Ok(result)
    }

    /// Replay a single operation and record the outcome in the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be updated.
    pub fn execute_one(&self, operation: &Operation) -> Result<ExecutionResult, MecalError> {
        let Some(op_id) = operation.id else {
            return Err(MecalError::validation("operation has not been queued"));
        };

        if self.config.dry_run {
            return Ok(ExecutionResult::skipped(operation));
        }

        if operation.exhausted(self.config.max_attempts) {
            let error = format!("gave up after {} attempts", operation.attempts);
            self.queue.mark_failed(op_id, &error)?;
            return Ok(ExecutionResult::failed(operation, error, true));
        }

        match self.apply(operation) {
            Ok(()) => {
                self.queue.remove(op_id)?;
                Ok(ExecutionResult::applied(operation))
            },
            Err(e) => {
                let error = e.to_string();
                log::warn!(
                    "sync of {} #{op_id} failed: {error}",
                    operation.operation_type.as_str()
                );
                self.queue.record_attempt(op_id, &error)?;

                let attempts = operation.attempts + 1;
                let parked = self.config.max_attempts.is_some_and(|max| attempts >= max);
                if parked {
                    self.queue.mark_failed(op_id, &error)?;
                }
                Ok(ExecutionResult::failed(operation, error, parked))
            },
        }
    }

    fn apply(&self, operation: &Operation) -> Result<(), MecalError> {
        match operation.operation_type {
            OperationType::CreateMemory => self.target.create_memory(&operation.decode()?),
            OperationType::DeleteMemory => self.target.delete_memory(&operation.decode()?),
            OperationType::CreateProject => self.target.create_project(&operation.decode()?),
            OperationType::UpdateProject => self.target.update_project(&operation.decode()?),
            OperationType::Unknown => {
                log::warn!(
                    "dropping queued operation #{} of unknown type",
                    operation.id.unwrap_or_default()
                );
                Ok(())
            },
        }
    }
}

/// Format sync result for display.
#[must_use]
pub fn format_sync_result(result: &SyncResult) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Sync completed: {} operations", result.total()));
    lines.push("─".repeat(40));

    if result.succeeded > 0 {
        lines.push(format!(
            "  {} {}",
            "✓".green(),
            format!("{} applied", result.succeeded).green()
        ));
    }

    if result.failed > 0 {
        lines.push(format!(
            "  {} {}",
            "✗".red(),
            format!("{} failed", result.failed).red()
        ));
    }

    if result.skipped > 0 {
        lines.push(format!(
            "  {} {}",
            "○".yellow(),
            format!("{} skipped (dry run)", result.skipped).yellow()
        ));
    }

    let errors: Vec<_> = result
        .results
        .iter()
        .filter(|r| r.error.is_some())
        .take(3)
        .collect();

    if !errors.is_empty() {
        lines.push(String::new());
        lines.push("Errors:".to_string());
        for err in errors {
            let parked = if err.parked { " (parked)" } else { "" };
            lines.push(format!(
                "  - #{} {}: {}{parked}",
                err.id,
                err.operation_type,
                err.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }

    if !result.remaining.is_empty() {
        lines.push(String::new());
        lines.push(
            format!("{} operation(s) still queued", result.remaining.len())
                .yellow()
                .to_string(),
        );
    }

    lines.join("\n")
}
