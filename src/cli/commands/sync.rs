//! Sync queue command implementation.
//!
//! Handles sync queue management commands.

use serde_json::json;

use super::Context;
use crate::api::{MemoryKey, NewProject, ProjectUpdate};
use crate::cli::args::{OutputFormat, QueueStatusArg, SyncCommands};
use crate::error::MecalError;
use crate::features::sync::{
    format_sync_result, ExecutorConfig, OperationStatus, SyncExecutor, SyncProgress, SyncQueue,
    SyncResult, SyncTarget,
};
use crate::output::{format_operations, format_queue_stats, to_json};

/// Execute sync subcommands.
///
/// # Errors
///
/// Returns an error if the queue cannot be read, or the backend is needed
/// and not configured.
pub fn sync(ctx: &Context, cmd: SyncCommands) -> Result<String, MecalError> {
    let db = ctx.database()?;
    let queue = SyncQueue::new(&db);

    match cmd {
        SyncCommands::Status => format_queue_stats(&queue.stats()?, ctx.format),
        SyncCommands::Run {
            stop_on_error,
            dry_run,
            max_attempts,
        } => {
            let mut config = ctx.executor_config();
            config.stop_on_error |= stop_on_error;
            config.dry_run = dry_run;
            if max_attempts.is_some() {
                config.max_attempts = max_attempts;
            }
            run_sync(ctx, &queue, config)
        },
        SyncCommands::List { status, limit } => {
            let mut operations = match status {
                Some(QueueStatusArg::Pending) => queue.get_by_status(OperationStatus::Pending)?,
                Some(QueueStatusArg::Failed) => queue.get_by_status(OperationStatus::Failed)?,
                None => queue.get_all()?,
            };
            if let Some(limit) = limit {
                operations.truncate(limit);
            }
            format_operations(&operations, ctx.format)
        },
        SyncCommands::Retry { all, id } => retry_operations(&queue, all, id, ctx.format),
        SyncCommands::Drop { id } => {
            if !queue.remove(id)? {
                return Err(MecalError::NotFound(format!("Operation {id}")));
            }
            match ctx.format {
                OutputFormat::Json => to_json(&json!({ "dropped": id })),
                OutputFormat::Pretty => Ok(format!("Dropped operation {id}")),
            }
        },
        SyncCommands::Clear { force } => {
            if !force {
                return Err(MecalError::Config(
                    "Use --force to clear all operations".to_string(),
                ));
            }
            let cleared = queue.clear()?;
            match ctx.format {
                OutputFormat::Json => to_json(&json!({ "cleared": cleared })),
                OutputFormat::Pretty => Ok(format!("Cleared {cleared} operation(s) from queue")),
            }
        },
    }
}

/// Stand-in target for dry runs, which never dispatch.
struct DryRun;

impl DryRun {
    fn refuse() -> Result<(), MecalError> {
        Err(MecalError::validation("dry run does not dispatch operations"))
    }
}

impl SyncTarget for DryRun {
    fn create_memory(&self, _key: &MemoryKey) -> Result<(), MecalError> {
        Self::refuse()
    }

    fn delete_memory(&self, _key: &MemoryKey) -> Result<(), MecalError> {
        Self::refuse()
    }

    fn create_project(&self, _project: &NewProject) -> Result<(), MecalError> {
        Self::refuse()
    }

    fn update_project(&self, _update: &ProjectUpdate) -> Result<(), MecalError> {
        Self::refuse()
    }
}

fn log_progress(progress: &SyncProgress<'_>) {
    // Failures are already logged by the executor.
    if progress.result.success {
        log::info!(
            "[{}/{}] {} {}",
            progress.index + 1,
            progress.total,
            progress.operation.operation_type.as_str(),
            progress.operation.summary()
        );
    }
}

/// Run sync operations.
fn run_sync(
    ctx: &Context,
    queue: &SyncQueue<'_>,
    config: ExecutorConfig,
) -> Result<String, MecalError> {
    let result = if config.dry_run {
        SyncExecutor::with_config(&DryRun, queue, config).execute_all(log_progress)?
    } else {
        ctx.with_api(|api| SyncExecutor::with_config(api, queue, config).execute_all(log_progress))?
    };

    match ctx.format {
        OutputFormat::Json => to_json(&result),
        OutputFormat::Pretty => Ok(render_run(&result)),
    }
}

fn render_run(result: &SyncResult) -> String {
    if result.total() == 0 {
        "No pending operations to sync.".to_string()
    } else {
        format_sync_result(result)
    }
}

/// Retry failed operations.
fn retry_operations(
    queue: &SyncQueue<'_>,
    all: bool,
    id: Option<i64>,
    format: OutputFormat,
) -> Result<String, MecalError> {
    let moved = match (id, all) {
        (Some(op_id), _) => {
            let moved = queue.requeue(Some(op_id))?;
            if moved == 0 {
                return Err(MecalError::NotFound(format!("Failed operation {op_id}")));
            }
            moved
        },
        (None, true) => queue.requeue(None)?,
        (None, false) => {
            return Err(MecalError::Config(
                "Specify --all or provide an operation ID".to_string(),
            ));
        },
    };

    match format {
        OutputFormat::Json => to_json(&json!({ "requeued": moved })),
        OutputFormat::Pretty => Ok(format!("Reset {moved} failed operation(s) for retry")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Paths};
    use crate::features::sync::Operation;
    use crate::storage::Database;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> Context {
        Context::new(
            Config::default(),
            Paths::with_root(dir.path().to_path_buf()),
            OutputFormat::Json,
        )
    }

    fn seed(db: &Database, count: usize) -> Vec<i64> {
        let queue = SyncQueue::new(db);
        (0..count)
            .map(|i| {
                let mut op = Operation::create_memory(&MemoryKey::new(format!("p{i}"), "circuit")).unwrap();
                queue.enqueue(&mut op).unwrap()
            })
            .collect()
    }

    fn json(out: &str) -> serde_json::Value {
        serde_json::from_str(out).unwrap()
    }

    #[test]
    fn test_dry_run_needs_no_backend() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        seed(&ctx.database().unwrap(), 2);

        let cmd = SyncCommands::Run {
            stop_on_error: false,
            dry_run: true,
            max_attempts: None,
        };
        let out = json(&sync(&ctx, cmd).unwrap());
        assert_eq!(out["skipped"], 2);
        assert_eq!(out["remaining"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_run_requires_backend() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        seed(&ctx.database().unwrap(), 1);

        let cmd = SyncCommands::Run {
            stop_on_error: false,
            dry_run: false,
            max_attempts: None,
        };
        assert!(matches!(sync(&ctx, cmd), Err(MecalError::Misconfigured(_))));
        assert_eq!(
            SyncQueue::new(&ctx.database().unwrap()).get_pending(None).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_list_with_limit() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        seed(&ctx.database().unwrap(), 3);

        let out = json(&sync(&ctx, SyncCommands::List { status: None, limit: Some(2) }).unwrap());
        assert_eq!(out["count"], 2);

        let failed = SyncCommands::List {
            status: Some(QueueStatusArg::Failed),
            limit: None,
        };
        assert_eq!(json(&sync(&ctx, failed).unwrap())["count"], 0);
    }

    #[test]
    fn test_retry_and_drop() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        let db = ctx.database().unwrap();
        let ids = seed(&db, 2);
        SyncQueue::new(&db).mark_failed(ids[0], "boom").unwrap();

        let out = json(&sync(&ctx, SyncCommands::Retry { all: false, id: Some(ids[0]) }).unwrap());
        assert_eq!(out["requeued"], 1);
        assert!(sync(&ctx, SyncCommands::Retry { all: false, id: Some(ids[0]) }).is_err());

        assert!(sync(&ctx, SyncCommands::Drop { id: ids[1] }).is_ok());
        assert!(matches!(
            sync(&ctx, SyncCommands::Drop { id: ids[1] }),
            Err(MecalError::NotFound(_))
        ));
    }

    #[test]
    fn test_clear_requires_force() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        seed(&ctx.database().unwrap(), 2);

        assert!(sync(&ctx, SyncCommands::Clear { force: false }).is_err());
        let out = json(&sync(&ctx, SyncCommands::Clear { force: true }).unwrap());
        assert_eq!(out["cleared"], 2);
    }

    #[test]
    fn test_render_empty_run() {
        assert_eq!(render_run(&SyncResult::empty()), "No pending operations to sync.");
    }
}
