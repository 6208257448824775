//! Offline operation queue and sync driver.
//!
//! Memory and project changes are queued locally first and replayed against
//! the backend by [`SyncExecutor`], one at a time in the order they were
//! queued.

pub mod executor;
pub mod operation;
pub mod queue;

pub use executor::{
    format_sync_result, is_syncing, ExecutionResult, ExecutorConfig, SyncExecutor, SyncLock,
    SyncProgress, SyncResult, SyncTarget,
};
pub use operation::{Operation, OperationStatus, OperationType};
pub use queue::{QueueStats, SyncQueue};
