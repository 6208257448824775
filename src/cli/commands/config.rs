//! Config command implementation.

use serde_json::json;

use super::Context;
use crate::cli::args::{ConfigCommands, OutputFormat};
use crate::config::Config;
use crate::error::MecalError;
use crate::output::to_json;

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the config file cannot be written or serialized.
pub fn config(ctx: &Context, cmd: ConfigCommands) -> Result<String, MecalError> {
    let path = &ctx.paths.config_file;

    match cmd {
        ConfigCommands::Show => {
            let masked = ctx.config.masked();
            match ctx.format {
                OutputFormat::Json => to_json(&masked),
                OutputFormat::Pretty => serde_yaml::to_string(&masked)
                    .map(|yaml| yaml.trim_end().to_string())
                    .map_err(|e| MecalError::Config(format!("Failed to serialize config: {e}"))),
            }
        },
        ConfigCommands::Path => match ctx.format {
            OutputFormat::Json => to_json(&json!({ "path": path })),
            OutputFormat::Pretty => Ok(path.display().to_string()),
        },
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                return Err(MecalError::Config(format!(
                    "{} already exists; use --force to overwrite",
                    path.display()
                )));
            }
            ctx.paths.ensure_dirs()?;
            Config::default().save_to_path(path)?;
            match ctx.format {
                OutputFormat::Json => to_json(&json!({ "written": path })),
                OutputFormat::Pretty => Ok(format!("Wrote default configuration to {}", path.display())),
            }
        },
    }
}
