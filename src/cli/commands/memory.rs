//! Memory command implementation.

use serde_json::json;

use super::{auto_sync, sync_note, Context};
use crate::backend::{normalize_memory_type, KNOWN_MEMORY_TYPES};
use crate::cli::args::{MemoryCommands, OutputFormat};
use crate::error::MecalError;
use crate::features::selection::{
    apply_selection, current_selection, toggle_memory, MemorySelection, SelectionChange,
};
use crate::features::sync::SyncQueue;
use crate::output::{format_memories, format_memory_types_pretty, to_json};
use crate::storage::LocalCache;

/// Execute memory subcommands.
///
/// # Errors
///
/// Returns an error if the backend call or local storage fails.
pub fn memory(ctx: &Context, cmd: MemoryCommands) -> Result<String, MecalError> {
    match cmd {
        MemoryCommands::List { project } => {
            let memories = ctx.with_api(|api| api.memories().list(&project))?;
            format_memories(&project, &memories, ctx.format)
        },
        MemoryCommands::Types { project } => memory_types(ctx, project.as_deref()),
        MemoryCommands::Toggle {
            project,
            memory_type,
            no_sync,
        } => toggle(ctx, &project, &memory_type, no_sync),
        MemoryCommands::Select {
            project,
            types,
            no_sync,
        } => select(ctx, &project, &types, no_sync),
    }
}

fn memory_types(ctx: &Context, project: Option<&str>) -> Result<String, MecalError> {
    let selection = match project {
        Some(project_id) => {
            let db = ctx.database()?;
            let queue = SyncQueue::new(&db);
            let cache = LocalCache::new(&db);
            Some(ctx.with_api(|api| current_selection(api, &queue, &cache, project_id))?)
        },
        None => None,
    };

    match ctx.format {
        OutputFormat::Json => to_json(&json!({
            "types": KNOWN_MEMORY_TYPES,
            "selected": selection.as_ref().map(|s| s.iter().collect::<Vec<_>>()),
        })),
        OutputFormat::Pretty => Ok(format_memory_types_pretty(selection.as_ref())),
    }
}

fn toggle(
    ctx: &Context,
    project_id: &str,
    memory_type: &str,
    no_sync: bool,
) -> Result<String, MecalError> {
    let db = ctx.database()?;
    let queue = SyncQueue::new(&db);
    let cache = LocalCache::new(&db);
    let memory_type = normalize_memory_type(memory_type);

    ctx.with_api(|api| {
        let mut selection = current_selection(api, &queue, &cache, project_id)?;
        let change = toggle_memory(&queue, &cache, project_id, &mut selection, &memory_type)?;
        let sync = auto_sync(ctx, api, &queue, no_sync)?;

        let verb = match change {
            SelectionChange::Added => "selected",
            SelectionChange::Removed => "deselected",
        };

        match ctx.format {
            OutputFormat::Json => to_json(&json!({
                "project_id": project_id,
                "memory_type": memory_type,
                "change": verb,
                "selected": selection.iter().collect::<Vec<_>>(),
                "sync": sync,
            })),
            OutputFormat::Pretty => Ok(format!(
                "{memory_type} {verb} for project {project_id} ({})",
                sync_note(sync.as_ref())
            )),
        }
    })
}

fn select(
    ctx: &Context,
    project_id: &str,
    types: &[String],
    no_sync: bool,
) -> Result<String, MecalError> {
    let desired: MemorySelection = types.iter().map(String::as_str).collect();

    let db = ctx.database()?;
    let queue = SyncQueue::new(&db);
    let cache = LocalCache::new(&db);

    ctx.with_api(|api| {
        let existing = current_selection(api, &queue, &cache, project_id)?;
        let queued = apply_selection(&queue, &cache, project_id, &existing, &desired)?;
        let sync = if queued > 0 {
            auto_sync(ctx, api, &queue, no_sync)?
        } else {
            None
        };

        match ctx.format {
            OutputFormat::Json => to_json(&json!({
                "project_id": project_id,
                "selected": desired.iter().collect::<Vec<_>>(),
                "queued": queued,
                "sync": sync,
            })),
            OutputFormat::Pretty if queued == 0 => {
                Ok(format!("Memories of project {project_id} unchanged"))
            },
            OutputFormat::Pretty => Ok(format!(
                "{queued} memory change(s) for project {project_id} ({})",
                sync_note(sync.as_ref())
            )),
        }
    })
}
