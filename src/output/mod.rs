//! Output formatting for mecal.
//!
//! Every formatter comes in a pretty and a JSON flavour; the functions here
//! pick one based on the requested [`OutputFormat`].

mod json;
mod pretty;

use crate::backend::{Assignment, Client, Memory, Profile, Project};
use crate::cli::args::OutputFormat;
use crate::error::MecalError;
use crate::features::sync::{Operation, QueueStats};

pub use json::*;
pub use pretty::*;

/// Format projects based on output format
///
/// # Errors
///
/// Returns `MecalError::Parse` if JSON serialization fails.
pub fn format_projects(projects: &[Project], format: OutputFormat) -> Result<String, MecalError> {
    match format {
        OutputFormat::Pretty => Ok(format_projects_pretty(projects)),
        OutputFormat::Json => format_list_json(projects),
    }
}

/// Format a single project based on output format
///
/// # Errors
///
/// Returns `MecalError::Parse` if JSON serialization fails.
pub fn format_project(project: &Project, format: OutputFormat) -> Result<String, MecalError> {
    match format {
        OutputFormat::Pretty => Ok(format_project_pretty(project)),
        OutputFormat::Json => to_json(project),
    }
}

/// # Errors
///
/// Returns `MecalError::Parse` if JSON serialization fails.
pub fn format_memories(
    project_id: &str,
    memories: &[Memory],
    format: OutputFormat,
) -> Result<String, MecalError> {
    match format {
        OutputFormat::Pretty => Ok(format_memories_pretty(project_id, memories)),
        OutputFormat::Json => format_list_json(memories),
    }
}

/// # Errors
///
/// Returns `MecalError::Parse` if JSON serialization fails.
pub fn format_assignments(
    assignments: &[Assignment],
    format: OutputFormat,
) -> Result<String, MecalError> {
    match format {
        OutputFormat::Pretty => Ok(format_assignments_pretty(assignments)),
        OutputFormat::Json => format_list_json(assignments),
    }
}

/// # Errors
///
/// Returns `MecalError::Parse` if JSON serialization fails.
pub fn format_clients(clients: &[Client], format: OutputFormat) -> Result<String, MecalError> {
    match format {
        OutputFormat::Pretty => Ok(format_clients_pretty(clients)),
        OutputFormat::Json => format_list_json(clients),
    }
}

/// # Errors
///
/// Returns `MecalError::Parse` if JSON serialization fails.
pub fn format_profiles(profiles: &[Profile], format: OutputFormat) -> Result<String, MecalError> {
    match format {
        OutputFormat::Pretty => Ok(format_profiles_pretty(profiles)),
        OutputFormat::Json => format_list_json(profiles),
    }
}

/// # Errors
///
/// Returns `MecalError::Parse` if JSON serialization fails.
pub fn format_operations(
    operations: &[Operation],
    format: OutputFormat,
) -> Result<String, MecalError> {
    match format {
        OutputFormat::Pretty => Ok(format_operations_pretty(operations)),
        OutputFormat::Json => format_list_json(operations),
    }
}

/// # Errors
///
/// Returns `MecalError::Parse` if JSON serialization fails.
pub fn format_queue_stats(stats: &QueueStats, format: OutputFormat) -> Result<String, MecalError> {
    match format {
        OutputFormat::Pretty => Ok(format_queue_stats_pretty(stats)),
        OutputFormat::Json => to_json(stats),
    }
}
