//! Assignment command implementation.

use serde_json::json;

use super::Context;
use crate::api::AssignmentKey;
use crate::cli::args::{AssignmentCommands, OutputFormat};
use crate::error::MecalError;
use crate::output::{format_assignments, to_json};

/// Execute assignment subcommands.
///
/// # Errors
///
/// Returns an error if the backend call fails.
pub fn assignment(ctx: &Context, cmd: AssignmentCommands) -> Result<String, MecalError> {
    match cmd {
        AssignmentCommands::List { memory } => {
            let assignments = ctx.with_api(|api| api.assignments().list(memory.as_deref()))?;
            format_assignments(&assignments, ctx.format)
        },
        AssignmentCommands::Add { memory, user } => {
            let assignment = ctx.with_api(|api| api.assignments().assign(&memory, &user))?;
            match ctx.format {
                OutputFormat::Json => to_json(&assignment),
                OutputFormat::Pretty => {
                    let who = assignment
                        .user
                        .as_ref()
                        .and_then(|u| u.full_name.as_deref())
                        .unwrap_or(&assignment.user_id);
                    Ok(format!("Assigned memory {} to {who}", assignment.memory_id))
                },
            }
        },
        AssignmentCommands::Remove { id, memory, user } => {
            let key = match (id, memory, user) {
                (Some(id), _, _) => AssignmentKey::Id(id),
                (None, Some(memory_id), Some(user_id)) => {
                    AssignmentKey::MemoryUser { memory_id, user_id }
                },
                _ => {
                    return Err(MecalError::validation(
                        "an assignment id, or a memory and a user, is required",
                    ))
                },
            };
            let removed = ctx.with_api(|api| api.assignments().unassign(&key))?;
            match ctx.format {
                OutputFormat::Json => to_json(&json!({ "removed": removed })),
                OutputFormat::Pretty => Ok(format!("Removed {removed} assignment(s)")),
            }
        },
    }
}
