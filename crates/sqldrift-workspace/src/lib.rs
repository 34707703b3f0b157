//! Scratch-schema workspaces
//!
//! A workspace is a short-lived schema where desired-state CREATE
//! statements are materialized so the result can be introspected and
//! diffed against live servers. Two variants exist: `TempSchema` runs on
//! a pre-existing shared server, `LocalDocker` on a managed local
//! container.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use mysql_async::Pool;

use sqldrift_core::{Error, Flavor, Instance, Schema, SessionParams, Vendor};

pub mod container;
pub mod error;
pub mod exec;
pub mod image;
pub mod shutdown;

mod local_docker;
mod lock;
mod temp_schema;

pub use container::{Container, ContainerCleanup, get_or_create_container, shutdown_containers};
pub use error::{Result, WorkspaceError};
pub use exec::{ExecResult, StatementFailure, Timings, exec_logical_schema};
pub use image::{ResolvedImage, resolve_image};
pub use local_docker::LocalDocker;
pub use shutdown::{register_shutdown_hook, run_shutdown_hooks};
pub use temp_schema::TempSchema;

/// Which workspace variant to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkspaceType {
    /// Scratch schema on a pre-existing server supplied by the caller
    #[default]
    TempSchema,
    /// Scratch schema inside a locally managed container
    LocalDocker,
}

impl FromStr for WorkspaceType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "temp-schema" => Ok(WorkspaceType::TempSchema),
            "docker" => Ok(WorkspaceType::LocalDocker),
            other => Err(Error::Config(format!("invalid workspace type '{other}'"))),
        }
    }
}

/// Aggressiveness of workspace population and cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempSchemaMode {
    /// One statement at a time, one connection
    Serial,
    Light,
    #[default]
    Regular,
    Heavy,
    /// Maximum concurrency; cleanup drops the whole schema in one shot
    Extreme,
}

impl TempSchemaMode {
    /// Worker count for parallel CREATE execution
    pub fn threads(&self) -> usize {
        match self {
            TempSchemaMode::Serial => 1,
            TempSchemaMode::Light => 2,
            TempSchemaMode::Regular => 5,
            TempSchemaMode::Heavy => 10,
            TempSchemaMode::Extreme => 15,
        }
    }

    /// CREATEs batched per round trip when multi-statement is available
    pub fn chunk_size(&self) -> usize {
        match self {
            TempSchemaMode::Serial => 1,
            TempSchemaMode::Light => 2,
            TempSchemaMode::Regular => 4,
            TempSchemaMode::Heavy => 8,
            TempSchemaMode::Extreme => 16,
        }
    }

    /// Tables dropped per DROP TABLE statement during cleanup
    pub fn drop_chunk_size(&self) -> usize {
        match self {
            TempSchemaMode::Serial => 1,
            TempSchemaMode::Light => 4,
            TempSchemaMode::Regular => 8,
            TempSchemaMode::Heavy => 16,
            TempSchemaMode::Extreme => 32,
        }
    }

    /// Whether cleanup may drop the whole schema in a single statement
    pub fn one_shot_drop(&self) -> bool {
        matches!(self, TempSchemaMode::Extreme)
    }
}

impl FromStr for TempSchemaMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "serial" => Ok(TempSchemaMode::Serial),
            "light" => Ok(TempSchemaMode::Light),
            "regular" => Ok(TempSchemaMode::Regular),
            "heavy" => Ok(TempSchemaMode::Heavy),
            "extreme" => Ok(TempSchemaMode::Extreme),
            other => Err(Error::Config(format!("invalid temp-schema-mode '{other}'"))),
        }
    }
}

/// Options for acquiring a workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceOpts {
    pub workspace_type: WorkspaceType,
    /// Required for `TempSchema`; ignored for `LocalDocker`
    pub instance: Option<Instance>,
    /// Server flavor to materialize against; selects the container image
    pub flavor: Flavor,
    /// Scratch schema name
    pub schema_name: String,
    pub default_charset: String,
    pub default_collation: Option<String>,
    /// Extra session variables for every workspace connection
    pub session_params: SessionParams,
    pub lock_timeout: Duration,
    /// Keep the scratch schema between runs, dropping only its objects
    pub reuse_temp_schema: bool,
    /// Disable binary logging for workspace sessions
    pub disable_binlog: bool,
    pub container_cleanup: ContainerCleanup,
    pub mode: TempSchemaMode,
    /// Worker-count override; 0 means use the mode's default
    pub threads: usize,
}

impl Default for WorkspaceOpts {
    fn default() -> Self {
        Self {
            workspace_type: WorkspaceType::TempSchema,
            instance: None,
            flavor: Flavor::new(Vendor::Mysql, 8, 0),
            schema_name: "_sqldrift_tmp".to_string(),
            default_charset: "utf8mb4".to_string(),
            default_collation: None,
            session_params: SessionParams::new(),
            lock_timeout: Duration::from_secs(30),
            reuse_temp_schema: false,
            disable_binlog: false,
            container_cleanup: ContainerCleanup::None,
            mode: TempSchemaMode::Regular,
            threads: 0,
        }
    }
}

impl WorkspaceOpts {
    /// Effective worker count: the explicit override, or the mode default.
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            self.mode.threads()
        }
    }

    /// Server-side advisory lock name guarding this workspace schema.
    pub fn lock_name(&self) -> String {
        format!("sqldrift.{}", self.schema_name)
    }
}

/// An introspected workspace: the materialized schema plus the session
/// environment it was materialized under.
#[derive(Debug, Clone)]
pub struct WorkspaceSchema {
    pub schema: Schema,
    pub flavor: Flavor,
    pub sql_mode: String,
}

/// Common contract of the two workspace variants.
#[async_trait]
pub trait Workspace: Send + Sync {
    /// The server hosting the scratch schema
    fn instance(&self) -> &Instance;

    fn schema_name(&self) -> &str;

    /// Pool with the workspace schema as default; `params` are merged on
    /// top of the workspace's own session defaults.
    async fn connection_pool(&self, params: &SessionParams) -> Result<Pool>;

    async fn introspect(&self) -> Result<WorkspaceSchema>;

    /// Release the scratch schema and the advisory lock.
    async fn cleanup(&mut self) -> Result<()>;
}

/// Acquire a workspace per the given options.
pub async fn create(opts: &WorkspaceOpts) -> Result<Box<dyn Workspace>> {
    match opts.workspace_type {
        WorkspaceType::TempSchema => Ok(Box::new(TempSchema::new(opts).await?)),
        WorkspaceType::LocalDocker => Ok(Box::new(LocalDocker::new(opts).await?)),
    }
}
