//! sqldrift apply - planning and applying schema changes
//!
//! This crate turns desired state plus live state into executed DDL:
//! - The planner expands a directory tree into per-server targets
//! - The applier diffs, verifies, lints, gates, prints, and executes
//! - Planned statements run directly or through external wrapper programs

pub mod apply;
pub mod ddl;
pub mod options;
pub mod plan;
pub mod printer;
pub mod result;
pub mod verify;

pub use apply::*;
pub use ddl::*;
pub use options::*;
pub use plan::*;
pub use printer::*;
pub use result::*;
pub use verify::*;
