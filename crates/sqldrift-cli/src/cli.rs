//! Command-line surface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "sqldrift",
    version,
    about = "Declarative schema management for MySQL and MariaDB"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Root of the desired-state directory tree
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// How many directory levels below the root to descend
    #[arg(long, global = true, default_value_t = 5)]
    pub max_depth: usize,

    /// Verbose logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the DDL needed to reconcile live schemas, without executing
    Diff(OperationArgs),
    /// Execute the DDL needed to reconcile live schemas
    Push(OperationArgs),
    /// Lint the desired-state schema definitions
    Lint(OperationArgs),
}

#[derive(Debug, Args)]
pub struct OperationArgs {
    /// Permit data-destructive statements
    #[arg(long)]
    pub allow_unsafe: bool,

    /// Treat tables smaller than this many bytes as safe to alter
    /// destructively
    #[arg(long)]
    pub safe_below_size: Option<u64>,

    /// External command handling ALTER TABLE statements
    #[arg(long)]
    pub alter_wrapper: Option<String>,

    /// Minimum table size in bytes before alter-wrapper is used
    #[arg(long, default_value_t = 0)]
    pub alter_wrapper_min_size: u64,

    /// External command handling all other DDL
    #[arg(long)]
    pub ddl_wrapper: Option<String>,

    /// ALGORITHM clause for generated ALTERs
    #[arg(long, default_value = "")]
    pub alter_algorithm: String,

    /// LOCK clause for generated ALTERs
    #[arg(long, default_value = "")]
    pub alter_lock: String,

    /// Partitioning handling: keep, remove, or permissive
    #[arg(long, default_value = "keep")]
    pub partitioning: String,

    /// Skip diff verification
    #[arg(long)]
    pub skip_verify: bool,

    /// Skip linting during push/diff
    #[arg(long)]
    pub skip_lint: bool,

    /// With diff: print one line per instance with differences
    #[arg(long)]
    pub brief: bool,

    /// Use only the first reachable host per directory
    #[arg(long)]
    pub first_only: bool,

    /// Enable server-side FK validation when adding foreign keys
    #[arg(long)]
    pub foreign_key_checks: bool,

    /// Strict matching of index order, FK names, and check constraints
    #[arg(long)]
    pub exact_match: bool,

    /// Ignore column order differences
    #[arg(long)]
    pub lax_column_order: bool,

    /// Ignore comment differences
    #[arg(long)]
    pub lax_comments: bool,

    /// Diff creation-time metadata of routines
    #[arg(long)]
    pub compare_metadata: bool,

    /// Include WITH VALIDATION when altering virtual columns
    #[arg(long)]
    pub alter_validate_virtual: bool,

    /// Instances applied concurrently
    #[arg(long, default_value_t = 1)]
    pub concurrent_servers: usize,

    /// Session variables for DDL connections, name=value comma separated
    #[arg(long)]
    pub connect_options: Option<String>,

    /// Value substituted for {ENVIRONMENT} in wrapper commands
    #[arg(long, default_value = "production")]
    pub environment: String,

    /// Default character set for workspace schemas
    #[arg(long, default_value = "utf8mb4")]
    pub default_character_set: String,

    /// Default collation for workspace schemas
    #[arg(long)]
    pub default_collation: Option<String>,

    /// Workspace type: temp-schema or docker
    #[arg(long, default_value = "temp-schema")]
    pub workspace: String,

    /// Scratch schema name
    #[arg(long, default_value = "_sqldrift_tmp")]
    pub temp_schema: String,

    /// Binary logging of workspace statements: on, off, or auto
    #[arg(long, default_value = "auto")]
    pub temp_schema_binlog: String,

    /// Workspace aggressiveness: serial, light, regular, heavy, extreme
    #[arg(long, default_value = "regular")]
    pub temp_schema_mode: String,

    /// Override the workspace worker count (0 = mode default)
    #[arg(long, default_value_t = 0)]
    pub temp_schema_threads: usize,

    /// Keep the scratch schema between runs
    #[arg(long)]
    pub reuse_temp_schema: bool,

    /// Container handling at exit: none, stop, or destroy
    #[arg(long, default_value = "none")]
    pub docker_cleanup: String,

    /// Server flavor for docker workspaces, e.g. mysql:8.0
    #[arg(long)]
    pub flavor: Option<String>,
}
