use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "mecal")]
#[command(about = "Track engineering memories for projects, with an offline sync queue")]
#[command(long_about = "mecal - engineering memory tracker

Manage projects and the typed memory documents attached to them (circuit,
protection, ducts, installation, testing). Memory changes are queued
locally and synced to the backend, so they survive a dropped connection.

QUICK START:
  mecal project list                      List visible projects
  mecal memory toggle <project> circuit   Select or deselect a memory
  mecal sync status                       Show what is still queued
  mecal sync run                          Replay queued changes

CONFIGURATION:
  ~/.mecal/config.yaml, or MECAL_BACKEND_URL / MECAL_SERVICE_KEY /
  MECAL_ACCESS_TOKEN in the environment. Set MECAL_HOME to move ~/.mecal.

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Defaults to `general.default_output` from the config file.
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Increase log verbosity (-v info, -vv debug)
    ///
    /// MECAL_LOG takes precedence when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage projects
    ///
    /// # Examples
    ///
    ///   mecal project list
    ///   mecal project create "Substation 12" --client 4 -m circuit,protection
    ///   mecal project edit <id> --status completed
    #[command(alias = "p")]
    Project(ProjectArgs),

    /// Manage the memories of a project
    ///
    /// Toggling and selecting memories queues create/delete operations and
    /// then syncs them (unless --no-sync or sync.auto_sync is off).
    #[command(alias = "m")]
    Memory(MemoryArgs),

    /// Assign memories to users
    #[command(alias = "a")]
    Assignment(AssignmentArgs),

    /// List clients
    Clients,

    /// List user profiles
    #[command(alias = "users")]
    Profiles,

    /// Inspect and replay the offline operation queue
    Sync(SyncArgs),

    /// Inspect or clear the local cache
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Generate shell completions
    ///
    /// # Examples
    ///
    ///   mecal completions bash > ~/.local/share/bash-completion/completions/mecal
    ///   mecal completions zsh --instructions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,

        /// Show installation instructions instead of the script
        #[arg(long)]
        instructions: bool,
    },
}

/// Arguments for project commands.
#[derive(Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommands,
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// List visible projects with their memory counts
    ///
    /// Falls back to the cached list when the backend is unreachable.
    #[command(alias = "ls")]
    List {
        /// Show the cached list without contacting the backend
        #[arg(long)]
        cached: bool,
    },

    /// Show a project
    Show {
        /// Project ID
        id: String,
    },

    /// Create a project
    Create(CreateProjectArgs),

    /// Edit a project and its memory selection
    Edit(EditProjectArgs),

    /// Delete a project and all its memories
    Delete {
        /// Project ID
        id: String,

        /// Required to actually delete
        #[arg(long, short = 'f')]
        force: bool,
    },
}

/// Arguments for creating a project.
#[derive(Args)]
pub struct CreateProjectArgs {
    /// Project name
    pub name: String,

    /// Client ID
    #[arg(long, short = 'c')]
    pub client: String,

    /// Cost center code
    #[arg(long)]
    pub cost_center: Option<String>,

    /// Initial status (default: active)
    #[arg(long)]
    pub status: Option<String>,

    /// Memory types to create with the project (comma-separated)
    #[arg(long, short = 'm', value_delimiter = ',')]
    pub memories: Vec<String>,

    /// Queue the memories without syncing them now
    #[arg(long)]
    pub no_sync: bool,

    /// Queue the project creation itself instead of calling the backend
    #[arg(long, conflicts_with = "memories")]
    pub offline: bool,
}

/// Arguments for editing a project.
#[derive(Args)]
pub struct EditProjectArgs {
    /// Project ID
    pub id: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New client ID
    #[arg(long, short = 'c')]
    pub client: Option<String>,

    /// New cost center code
    #[arg(long, conflicts_with = "clear_cost_center")]
    pub cost_center: Option<String>,

    /// Remove the cost center
    #[arg(long)]
    pub clear_cost_center: bool,

    /// New status
    #[arg(long)]
    pub status: Option<String>,

    /// Exact set of memory types the project should have (comma-separated)
    #[arg(long, short = 'm', value_delimiter = ',')]
    pub memories: Option<Vec<String>>,

    /// Queue the changes without syncing them now
    #[arg(long)]
    pub no_sync: bool,

    /// Queue the field update instead of calling the backend
    #[arg(long)]
    pub offline: bool,
}

/// Arguments for memory commands.
#[derive(Args)]
pub struct MemoryArgs {
    #[command(subcommand)]
    pub command: MemoryCommands,
}

#[derive(Subcommand)]
pub enum MemoryCommands {
    /// List the memories of a project
    #[command(alias = "ls")]
    List {
        /// Project ID
        project: String,
    },

    /// Show the known memory types, marking a project's selection
    Types {
        /// Project ID
        project: Option<String>,
    },

    /// Select or deselect one memory type
    Toggle {
        /// Project ID
        project: String,

        /// Memory type, e.g. circuit
        memory_type: String,

        /// Only queue the change
        #[arg(long)]
        no_sync: bool,
    },

    /// Set the exact memory selection of a project
    Select {
        /// Project ID
        project: String,

        /// Memory types (comma-separated); empty deselects everything
        #[arg(value_delimiter = ',')]
        types: Vec<String>,

        /// Only queue the changes
        #[arg(long)]
        no_sync: bool,
    },
}

/// Arguments for assignment commands.
#[derive(Args)]
pub struct AssignmentArgs {
    #[command(subcommand)]
    pub command: AssignmentCommands,
}

#[derive(Subcommand)]
pub enum AssignmentCommands {
    /// List assignments
    #[command(alias = "ls")]
    List {
        /// Only assignments of this memory
        #[arg(long)]
        memory: Option<String>,
    },

    /// Assign a memory to a user (replaces the current assignee)
    Add {
        /// Memory ID
        memory: String,

        /// User ID
        user: String,
    },

    /// Remove an assignment by ID, or by memory and user
    Remove {
        /// Assignment ID
        #[arg(required_unless_present_all = ["memory", "user"])]
        id: Option<String>,

        /// Memory ID
        #[arg(long, requires = "user", conflicts_with = "id")]
        memory: Option<String>,

        /// User ID
        #[arg(long, requires = "memory", conflicts_with = "id")]
        user: Option<String>,
    },
}

/// Arguments for sync queue.
#[derive(Args)]
pub struct SyncArgs {
    #[command(subcommand)]
    pub command: SyncCommands,
}

/// Sync queue subcommands.
#[derive(Subcommand)]
pub enum SyncCommands {
    /// Show sync queue status
    Status,

    /// Replay pending operations against the backend
    Run {
        /// Stop on first error
        #[arg(long)]
        stop_on_error: bool,

        /// Show what would be replayed without doing it
        #[arg(long)]
        dry_run: bool,

        /// Park operations as failed after this many attempts
        #[arg(long)]
        max_attempts: Option<u32>,
    },

    /// List queued operations
    #[command(alias = "ls")]
    List {
        /// Only operations with this status
        #[arg(long, short = 's', value_enum)]
        status: Option<QueueStatusArg>,

        /// Maximum operations to show
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Move failed operations back to pending
    Retry {
        /// Retry all failed operations
        #[arg(long, conflicts_with = "id")]
        all: bool,

        /// Operation ID to retry
        #[arg(required_unless_present = "all")]
        id: Option<i64>,
    },

    /// Remove one operation from the queue without replaying it
    Drop {
        /// Operation ID
        id: i64,
    },

    /// Remove every queued operation
    Clear {
        /// Required to actually clear
        #[arg(long, short = 'f')]
        force: bool,
    },
}

/// Queue status filter.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueStatusArg {
    Pending,
    Failed,
}

/// Arguments for cache commands.
#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommands,
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show cached projects, or one project's cached memory selection
    Show {
        /// Project ID
        project: Option<String>,
    },

    /// Drop every cached entry
    Clear,
}

/// Arguments for config commands.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration (secrets masked)
    Show,

    /// Print the configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short = 'f')]
        force: bool,
    },
}
