//! Error types for sqldrift

use thiserror::Error;

/// Core error type for sqldrift operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Server error {code}: {message}")]
    Server { code: u16, message: String },

    #[error("Introspection error: {0}")]
    Introspection(String),

    #[error("Not empty: {0}")]
    NotEmpty(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for sqldrift operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<mysql_async::Error> for Error {
    fn from(err: mysql_async::Error) -> Self {
        match err {
            mysql_async::Error::Server(server) => Error::Server {
                code: server.code,
                message: server.message,
            },
            mysql_async::Error::Io(io) => Error::Connection(io.to_string()),
            other => Error::Connection(other.to_string()),
        }
    }
}

impl Error {
    /// Returns the MySQL server error code, if this error came from the server.
    pub fn server_code(&self) -> Option<u16> {
        match self {
            Error::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True for deadlocks and lock-wait timeouts, both row-level and
    /// metadata-level. These are expected during concurrent DDL on servers
    /// that extend metadata locks to foreign-key parents, and callers retry
    /// the statement sequentially.
    pub fn is_lock_conflict(&self) -> bool {
        matches!(self.server_code(), Some(1205) | Some(1213) | Some(3572))
    }

    /// True when a referenced object does not (yet) exist: unknown database,
    /// unknown table, or unknown routine. Seen when `CREATE TABLE ... LIKE`
    /// runs before its source table in a parallel populate.
    pub fn is_missing_object(&self) -> bool {
        matches!(self.server_code(), Some(1049) | Some(1146) | Some(1305))
    }

    /// True when the object already exists (duplicate table or routine).
    pub fn is_duplicate_object(&self) -> bool {
        matches!(self.server_code(), Some(1050) | Some(1304))
    }
}
