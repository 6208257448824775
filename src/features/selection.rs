//! Memory selection for a project.
//!
//! Selecting or deselecting a memory type never talks to the backend
//! directly: each change is cached locally and queued as an operation for
//! the sync driver.

use std::collections::BTreeSet;

use crate::api::{Api, MemoryKey, NewProject};
use crate::backend::{normalize_memory_type, Memory, Project, KNOWN_MEMORY_TYPES};
use crate::error::MecalError;
use crate::features::sync::{
    ExecutorConfig, Operation, OperationType, SyncExecutor, SyncLock, SyncQueue, SyncResult,
};
use crate::storage::{CachedMemory, LocalCache};

/// Outcome of toggling one memory type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Added,
    Removed,
}

/// The set of memory types selected for a project. Types are stored normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySelection {
    types: BTreeSet<String>,
}

impl MemorySelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_memories(memories: &[Memory]) -> Self {
        memories.iter().map(|m| m.memory_type.as_str()).collect()
    }

    #[must_use]
    pub fn from_cached(cached: &[CachedMemory]) -> Self {
        cached.iter().map(|m| m.memory_type.as_str()).collect()
    }

    #[must_use]
    pub fn contains(&self, memory_type: &str) -> bool {
        self.types.contains(&normalize_memory_type(memory_type))
    }

    /// Flip a type in or out of the selection.
    pub fn toggle(&mut self, memory_type: &str) -> SelectionChange {
        let memory_type = normalize_memory_type(memory_type);
        if self.types.remove(&memory_type) {
            SelectionChange::Removed
        } else {
            self.types.insert(memory_type);
            SelectionChange::Added
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn to_cached(&self) -> Vec<CachedMemory> {
        self.iter().map(CachedMemory::new).collect()
    }

    /// Replay queued memory operations for `project_id` on top of this
    /// selection, in queue order. Creates insert and deletes remove, so
    /// folding an operation that is already reflected changes nothing.
    pub fn apply_pending(&mut self, project_id: &str, operations: &[Operation]) {
        for operation in operations {
            let insert = match operation.operation_type {
                OperationType::CreateMemory => true,
                OperationType::DeleteMemory => false,
                _ => continue,
            };
            let Ok(key) = operation.decode::<MemoryKey>() else {
                continue;
            };
            if key.project_id.trim() != project_id {
                continue;
            }
            let memory_type = normalize_memory_type(&key.memory_type);
            if memory_type.is_empty() {
                continue;
            }
            if insert {
                self.types.insert(memory_type);
            } else {
                self.types.remove(&memory_type);
            }
        }
    }
}

impl<'s> FromIterator<&'s str> for MemorySelection {
    fn from_iter<I: IntoIterator<Item = &'s str>>(iter: I) -> Self {
        Self {
            types: iter
                .into_iter()
                .map(normalize_memory_type)
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

/// Load the current selection for a project.
///
/// Reads the backend, then folds in the memory operations still pending in
/// the queue, and refreshes the cache with the result. If the backend cannot
/// be reached the cached selection is used instead.
///
/// # Errors
///
/// Returns the backend error when nothing is cached either.
pub fn current_selection(
    api: &Api<'_>,
    queue: &SyncQueue<'_>,
    cache: &LocalCache<'_>,
    project_id: &str,
) -> Result<MemorySelection, MecalError> {
    let project_id = project_id.trim();
    let mut selection = match api.memories().list(project_id) {
        Ok(memories) => MemorySelection::from_memories(&memories),
        Err(e) => match cache.get_project_memories(project_id)? {
            Some(cached) => {
                log::warn!("using cached memories for project {project_id}: {e}");
                MemorySelection::from_cached(&cached)
            },
            None => return Err(e),
        },
    };

    selection.apply_pending(project_id, &queue.get_pending(None)?);
    cache.set_project_memories(project_id, &selection.to_cached())?;
    Ok(selection)
}

/// Toggle a memory type for an existing project: update the selection and
/// the cache, then queue the matching create or delete.
///
/// # Errors
///
/// Returns `Validation` for a blank project or type, or a local storage error.
pub fn toggle_memory(
    queue: &SyncQueue<'_>,
    cache: &LocalCache<'_>,
    project_id: &str,
    selection: &mut MemorySelection,
    memory_type: &str,
) -> Result<SelectionChange, MecalError> {
    let project_id = project_id.trim();
    let memory_type = normalize_memory_type(memory_type);
    if project_id.is_empty() || memory_type.is_empty() {
        return Err(MecalError::validation("project_id and type are required"));
    }

    let change = selection.toggle(&memory_type);
    cache.set_project_memories(project_id, &selection.to_cached())?;

    let key = MemoryKey::new(project_id, memory_type);
    let mut operation = match change {
        SelectionChange::Added => Operation::create_memory(&key)?,
        SelectionChange::Removed => Operation::delete_memory(&key)?,
    };
    queue.enqueue(&mut operation)?;
    Ok(change)
}

/// Operations turning `existing` into `desired`, over the known memory types.
///
/// # Errors
///
/// Returns an error if a payload cannot be serialized.
pub fn reconcile(
    project_id: &str,
    existing: &MemorySelection,
    desired: &MemorySelection,
) -> Result<Vec<Operation>, MecalError> {
    let mut operations = Vec::new();
    for memory_type in KNOWN_MEMORY_TYPES {
        let key = MemoryKey::new(project_id, memory_type);
        match (existing.contains(memory_type), desired.contains(memory_type)) {
            (false, true) => operations.push(Operation::create_memory(&key)?),
            (true, false) => operations.push(Operation::delete_memory(&key)?),
            _ => {},
        }
    }
    Ok(operations)
}

/// Enqueue the operations that bring a project to `desired` and cache it.
/// Returns how many operations were queued.
///
/// # Errors
///
/// Returns a local storage error.
pub fn apply_selection(
    queue: &SyncQueue<'_>,
    cache: &LocalCache<'_>,
    project_id: &str,
    existing: &MemorySelection,
    desired: &MemorySelection,
) -> Result<usize, MecalError> {
    let operations = reconcile(project_id, existing, desired)?;
    for mut operation in operations.iter().cloned() {
        queue.enqueue(&mut operation)?;
    }
    cache.set_project_memories(project_id, &desired.to_cached())?;
    Ok(operations.len())
}

/// A project created together with its initial memories.
#[derive(Debug)]
pub struct CreatedProject {
    pub project: Project,
    /// `None` when the sync was not run
    pub sync: Option<SyncResult>,
}

/// Create a project, queue a memory for each selected type and, when `sync`
/// is given, drain the queue right away under that lock.
///
/// # Errors
///
/// Returns an error if the project cannot be created or the queue cannot be
/// written. Failed memory operations stay queued and are reported through
/// the sync result.
pub fn create_project_with_memories(
    api: &Api<'_>,
    queue: &SyncQueue<'_>,
    cache: &LocalCache<'_>,
    new: &NewProject,
    selection: &MemorySelection,
    sync: Option<(&SyncLock, ExecutorConfig)>,
) -> Result<CreatedProject, MecalError> {
    let project = api.projects().create(new)?;

    for memory_type in selection.iter() {
        let mut operation = Operation::create_memory(&MemoryKey::new(project.id.as_str(), memory_type))?;
        queue.enqueue(&mut operation)?;
    }
    cache.set_project_memories(&project.id, &selection.to_cached())?;

    let sync = match sync {
        Some((lock, config)) => {
            let result = SyncExecutor::with_config(api, queue, config)
                .with_lock(lock)
                .execute_all(|_| {})?;
            if !result.remaining.is_empty() {
                log::warn!(
                    "{} operation(s) for project {} are still queued",
                    result.remaining.len(),
                    project.id
                );
            }
            Some(result)
        },
        None => None,
    };

    Ok(CreatedProject { project, sync })
}
