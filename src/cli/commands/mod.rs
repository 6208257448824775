//! Command implementations for mecal.
//!
//! Every command returns the text to print; `main` decides where it goes.

mod assignment;
mod cache;
mod config;
mod memory;
mod project;
mod sync;

pub use assignment::assignment;
pub use cache::cache;
pub use config::config;
pub use memory::memory;
pub use project::project;
pub use sync::sync;

use clap_complete::Shell;

use crate::api::{Actor, Api};
use crate::backend::RestBackend;
use crate::cli::args::OutputFormat;
use crate::config::{Config, Paths};
use crate::error::MecalError;
use crate::features::shell::{completion_install_instructions, generate_completions};
use crate::features::sync::{ExecutorConfig, SyncExecutor, SyncQueue, SyncResult};
use crate::output::{format_clients, format_profiles};
use crate::storage::Database;

/// Everything a command needs from the environment.
pub struct Context {
    pub config: Config,
    pub paths: Paths,
    pub format: OutputFormat,
}

impl Context {
    #[must_use]
    pub const fn new(config: Config, paths: Paths, format: OutputFormat) -> Self {
        Self {
            config,
            paths,
            format,
        }
    }

    /// Open the local database, creating the data directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn database(&self) -> Result<Database, MecalError> {
        self.paths.ensure_dirs()?;
        Database::open_at(&self.paths.database)
    }

    /// Connect to the backend.
    ///
    /// # Errors
    ///
    /// Returns `Misconfigured` if credentials are missing.
    pub fn backend(&self) -> Result<RestBackend, MecalError> {
        RestBackend::from_config(&self.config.backend)
    }

    /// Run `f` with handlers bound to the configured actor.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or `Misconfigured`.
    pub fn with_api<T, F>(&self, f: F) -> Result<T, MecalError>
    where
        F: FnOnce(&Api<'_>) -> Result<T, MecalError>,
    {
        let backend = self.backend()?;
        let actor = Actor::resolve(&backend, self.config.auth.access_token.as_deref());
        f(&Api::new(&backend, actor))
    }

    fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::from(&self.config.sync)
    }
}

/// Drain the queue after a local change when auto-sync is on.
///
/// A failing backend leaves the queue intact; the returned note says so.
fn auto_sync(
    ctx: &Context,
    api: &Api<'_>,
    queue: &SyncQueue<'_>,
    no_sync: bool,
) -> Result<Option<SyncResult>, MecalError> {
    if no_sync || !ctx.config.sync.auto_sync {
        return Ok(None);
    }
    let result = SyncExecutor::with_config(api, queue, ctx.executor_config()).execute_all(|_| {})?;
    Ok(Some(result))
}

/// One-line note about what auto-sync left behind.
fn sync_note(result: Option<&SyncResult>) -> String {
    match result {
        None => "queued; run `mecal sync run` to apply".to_string(),
        Some(r) if r.remaining.is_empty() => "synced".to_string(),
        Some(r) => format!(
            "{} operation(s) still queued; run `mecal sync run` to retry",
            r.remaining.len()
        ),
    }
}

/// Execute clients command
///
/// # Errors
///
/// Returns an error if the backend call fails or output formatting fails.
pub fn clients(ctx: &Context) -> Result<String, MecalError> {
    let clients = ctx.with_api(|api| api.directory().clients())?;
    format_clients(&clients, ctx.format)
}

/// Execute profiles command
///
/// # Errors
///
/// Returns an error if the backend call fails or output formatting fails.
pub fn profiles(ctx: &Context) -> Result<String, MecalError> {
    let profiles = ctx.with_api(|api| api.directory().profiles())?;
    format_profiles(&profiles, ctx.format)
}

/// Execute completions command
///
/// # Errors
///
/// Returns an error if the script cannot be generated.
pub fn completions(shell: Shell, instructions: bool) -> Result<String, MecalError> {
    if instructions {
        Ok(completion_install_instructions(shell))
    } else {
        generate_completions(shell)
    }
}
