//! Cache command implementation.

use serde_json::json;

use super::Context;
use crate::cli::args::{CacheCommands, OutputFormat};
use crate::error::MecalError;
use crate::features::selection::MemorySelection;
use crate::output::{format_memory_types_pretty, format_projects, to_json};
use crate::storage::LocalCache;

/// Execute cache subcommands.
///
/// # Errors
///
/// Returns an error if the local database cannot be read.
pub fn cache(ctx: &Context, cmd: CacheCommands) -> Result<String, MecalError> {
    let db = ctx.database()?;
    let cache = LocalCache::new(&db);

    match cmd {
        CacheCommands::Show { project: None } => {
            let projects = cache.get_projects()?.unwrap_or_default();
            format_projects(&projects, ctx.format)
        },
        CacheCommands::Show {
            project: Some(project_id),
        } => {
            let selection = cache
                .get_project_memories(&project_id)?
                .map(|cached| MemorySelection::from_cached(&cached));
            match (ctx.format, selection) {
                (OutputFormat::Json, selection) => to_json(&json!({
                    "project_id": project_id,
                    "memories": selection.as_ref().map(|s| s.iter().collect::<Vec<_>>()),
                })),
                (OutputFormat::Pretty, Some(selection)) => {
                    Ok(format_memory_types_pretty(Some(&selection)))
                },
                (OutputFormat::Pretty, None) => {
                    Ok(format!("Nothing cached for project {project_id}"))
                },
            }
        },
        CacheCommands::Clear => {
            let cleared = cache.clear()?;
            match ctx.format {
                OutputFormat::Json => to_json(&json!({ "cleared": cleared })),
                OutputFormat::Pretty => Ok(format!("Cleared {cleared} cache entr(ies)")),
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Paths};
    use crate::storage::CachedMemory;
    use tempfile::TempDir;

    #[test]
    fn test_show_and_clear_project_cache() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::new(
            Config::default(),
            Paths::with_root(dir.path().to_path_buf()),
            OutputFormat::Json,
        );
        {
            let db = ctx.database().unwrap();
            LocalCache::new(&db)
                .set_project_memories("p1", &[CachedMemory::new("ducts")])
                .unwrap();
        }

        let show = || CacheCommands::Show {
            project: Some("p1".to_string()),
        };
        let out: serde_json::Value = serde_json::from_str(&cache(&ctx, show()).unwrap()).unwrap();
        assert_eq!(out["memories"], json!(["ducts"]));

        let out: serde_json::Value =
            serde_json::from_str(&cache(&ctx, CacheCommands::Clear).unwrap()).unwrap();
        assert_eq!(out["cleared"], 1);

        let out: serde_json::Value = serde_json::from_str(&cache(&ctx, show()).unwrap()).unwrap();
        assert!(out["memories"].is_null());
    }
}
