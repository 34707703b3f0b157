//! Workspace error types

use thiserror::Error;

use sqldrift_core::Flavor;

/// Errors raised while acquiring, populating, or releasing a workspace
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// Another process holds the advisory lock for this workspace schema
    #[error("workspace lock '{0}' is held by another process")]
    LockBusy(String),

    /// No container image can be determined for the requested flavor
    #[error("no container image available for flavor {0}")]
    UnsupportedFlavor(Flavor),

    /// A temp-schema workspace was requested without a server to run on
    #[error("temp-schema workspace requires an instance")]
    InstanceRequired,

    #[error("container error: {0}")]
    Container(String),

    /// Introspection found a different object count than expected.
    /// Guards against statements silently dropping or creating extra
    /// objects during populate.
    #[error("workspace contains {actual} objects but {expected} were expected")]
    ObjectCountMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Core(#[from] sqldrift_core::Error),
}

pub type Result<T> = std::result::Result<T, WorkspaceError>;
