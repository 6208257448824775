//! Project command implementation.

use serde_json::json;

use super::{auto_sync, sync_note, Context};
use crate::api::{NewProject, ProjectUpdate};
use crate::cli::args::{CreateProjectArgs, EditProjectArgs, OutputFormat, ProjectCommands};
use crate::error::MecalError;
use crate::features::selection::{
    apply_selection, create_project_with_memories, current_selection, MemorySelection,
};
use crate::features::sync::{Operation, SyncLock, SyncQueue};
use crate::output::{format_project, format_project_pretty, format_projects, to_json};
use crate::storage::LocalCache;

/// Execute project subcommands.
///
/// # Errors
///
/// Returns an error if the backend call or local storage fails.
pub fn project(ctx: &Context, cmd: ProjectCommands) -> Result<String, MecalError> {
    match cmd {
        ProjectCommands::List { cached } => list_projects(ctx, cached),
        ProjectCommands::Show { id } => {
            let project = ctx.with_api(|api| api.projects().get(&id))?;
            format_project(&project, ctx.format)
        },
        ProjectCommands::Create(args) => create_project(ctx, args),
        ProjectCommands::Edit(args) => edit_project(ctx, args),
        ProjectCommands::Delete { id, force } => delete_project(ctx, &id, force),
    }
}

/// List projects, refreshing the cache, or showing it when the backend fails.
fn list_projects(ctx: &Context, cached: bool) -> Result<String, MecalError> {
    let db = ctx.database()?;
    let cache = LocalCache::new(&db);

    if cached {
        let projects = cache.get_projects()?.unwrap_or_default();
        return format_projects(&projects, ctx.format);
    }

    let projects = match ctx.with_api(|api| api.projects().list()) {
        Ok(projects) => {
            cache.set_projects(&projects)?;
            projects
        },
        Err(e) => match cache.get_projects()? {
            Some(projects) => {
                log::warn!("showing cached projects: {e}");
                projects
            },
            None => return Err(e),
        },
    };

    format_projects(&projects, ctx.format)
}

fn create_project(ctx: &Context, args: CreateProjectArgs) -> Result<String, MecalError> {
    let new = NewProject {
        name: args.name,
        client_id: args.client,
        cost_center: args.cost_center,
        status: args.status,
    };

    let db = ctx.database()?;
    let queue = SyncQueue::new(&db);

    if args.offline {
        let mut operation = Operation::create_project(&new)?;
        queue.enqueue(&mut operation)?;
        return match ctx.format {
            OutputFormat::Json => to_json(&operation),
            OutputFormat::Pretty => Ok(format!(
                "Queued {} operation (ID: {})",
                operation.operation_type.display_name(),
                operation.id.unwrap_or_default()
            )),
        };
    }

    let cache = LocalCache::new(&db);
    let selection: MemorySelection = args.memories.iter().map(String::as_str).collect();
    let sync = (!args.no_sync && ctx.config.sync.auto_sync)
        .then(|| (SyncLock::process(), ctx.executor_config()));

    let created = ctx.with_api(|api| {
        create_project_with_memories(api, &queue, &cache, &new, &selection, sync)
    })?;

    match ctx.format {
        OutputFormat::Json => to_json(&json!({
            "project": created.project,
            "memories": selection.iter().collect::<Vec<_>>(),
            "sync": created.sync,
        })),
        OutputFormat::Pretty => {
            let project = format_project_pretty(&created.project);
            if selection.is_empty() {
                Ok(project)
            } else {
                Ok(format!(
                    "{project}\n\n{} memories: {}",
                    selection.len(),
                    sync_note(created.sync.as_ref())
                ))
            }
        },
    }
}

fn edit_project(ctx: &Context, args: EditProjectArgs) -> Result<String, MecalError> {
    let update = ProjectUpdate {
        id: args.id,
        name: args.name,
        client_id: args.client,
        cost_center: if args.clear_cost_center {
            Some(None)
        } else {
            args.cost_center.map(Some)
        },
        status: args.status,
    };
    let desired: Option<MemorySelection> = args
        .memories
        .as_ref()
        .map(|types| types.iter().map(String::as_str).collect());

    let db = ctx.database()?;
    let queue = SyncQueue::new(&db);
    let cache = LocalCache::new(&db);

    if args.offline {
        let mut queued = 0;
        if !update.is_empty() {
            let mut operation = Operation::update_project(&update)?;
            queue.enqueue(&mut operation)?;
            queued += 1;
        }
        if let Some(desired) = &desired {
            let mut existing = cache
                .get_project_memories(&update.id)?
                .map(|cached| MemorySelection::from_cached(&cached))
                .unwrap_or_default();
            existing.apply_pending(&update.id, &queue.get_pending(None)?);
            queued += apply_selection(&queue, &cache, &update.id, &existing, desired)?;
        }
        return match ctx.format {
            OutputFormat::Json => to_json(&json!({ "id": update.id, "queued": queued })),
            OutputFormat::Pretty => Ok(format!(
                "Queued {queued} operation(s) for project {}",
                update.id
            )),
        };
    }

    ctx.with_api(|api| {
        let project = api.projects().update(&update)?;

        let mut queued = 0;
        if let Some(desired) = &desired {
            let existing = current_selection(api, &queue, &cache, &project.id)?;
            queued = apply_selection(&queue, &cache, &project.id, &existing, desired)?;
        }
        let sync = if queued > 0 {
            auto_sync(ctx, api, &queue, args.no_sync)?
        } else {
            None
        };

        match ctx.format {
            OutputFormat::Json => to_json(&json!({
                "project": project,
                "queued": queued,
                "sync": sync,
            })),
            OutputFormat::Pretty => {
                let rendered = format_project_pretty(&project);
                match (&desired, queued) {
                    (None, _) => Ok(rendered),
                    (Some(_), 0) => Ok(format!("{rendered}\n\nmemories unchanged")),
                    (Some(_), n) => Ok(format!(
                        "{rendered}\n\n{n} memory change(s): {}",
                        sync_note(sync.as_ref())
                    )),
                }
            },
        }
    })
}

fn delete_project(ctx: &Context, id: &str, force: bool) -> Result<String, MecalError> {
    if !force {
        return Err(MecalError::Config(format!(
            "Use --force to delete project {id} and all its memories"
        )));
    }

    ctx.with_api(|api| api.projects().delete(id))?;

    let db = ctx.database()?;
    LocalCache::new(&db).set_project_memories(id, &[])?;

    match ctx.format {
        OutputFormat::Json => to_json(&json!({ "deleted": id })),
        OutputFormat::Pretty => Ok(format!("Deleted project {id}")),
    }
}
