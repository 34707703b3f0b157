//! Per-target option surface consumed by the applier

use sqldrift_core::{Flavor, SessionParams};
use sqldrift_diff::{AlgorithmClause, LockClause, PartitioningMode, StatementModifiers};
use sqldrift_lint::LintOptions;
use sqldrift_workspace::WorkspaceOpts;

/// Options controlling how one target is diffed, gated, and applied.
/// Resolved per directory by the configuration layer.
#[derive(Debug, Clone)]
pub struct TargetOptions {
    /// Permit data-destructive statements
    pub allow_unsafe: bool,
    /// Waive the unsafe gate for tables smaller than this many bytes
    pub safe_below_size: Option<u64>,
    /// External program handling ALTER TABLE statements
    pub alter_wrapper: Option<String>,
    /// Minimum table size before the alter wrapper is used
    pub alter_wrapper_min_size: u64,
    /// External program handling everything the alter wrapper does not
    pub ddl_wrapper: Option<String>,
    pub alter_algorithm: AlgorithmClause,
    pub alter_lock: LockClause,
    pub partitioning: PartitioningMode,
    /// Replay ALTERs in a workspace to prove their correctness
    pub verify: bool,
    /// Run lint rules on modified objects before applying
    pub lint: bool,
    /// One line per instance with differences instead of full SQL
    pub brief: bool,
    /// Print without executing
    pub dry_run: bool,
    /// Enable server FK validation when adding foreign keys
    pub foreign_key_checks: bool,
    pub lax_column_order: bool,
    pub lax_comments: bool,
    /// Strict matching of index order, FK names, and check constraints
    pub exact_match: bool,
    pub compare_metadata: bool,
    pub alter_validate_virtual: bool,
    /// Value substituted for {ENVIRONMENT} in wrapper commands
    pub environment: String,
    /// `connect-options` session variables for DDL connections
    pub connect_params: SessionParams,
    /// Fan-out bound across instances
    pub concurrent_servers: usize,
    pub lint_options: LintOptions,
    /// Workspace settings used for materialization and verification
    pub workspace: WorkspaceOpts,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            allow_unsafe: false,
            safe_below_size: None,
            alter_wrapper: None,
            alter_wrapper_min_size: 0,
            ddl_wrapper: None,
            alter_algorithm: AlgorithmClause::Unset,
            alter_lock: LockClause::Unset,
            partitioning: PartitioningMode::Keep,
            verify: true,
            lint: true,
            brief: false,
            dry_run: false,
            foreign_key_checks: false,
            lax_column_order: false,
            lax_comments: false,
            exact_match: false,
            compare_metadata: false,
            alter_validate_virtual: false,
            environment: "production".to_string(),
            connect_params: SessionParams::new(),
            concurrent_servers: 1,
            lint_options: LintOptions::default(),
            workspace: WorkspaceOpts::default(),
        }
    }
}

impl TargetOptions {
    /// Derive the statement modifiers for ordinary (non-verification)
    /// statement generation against a server of the given flavor.
    pub fn statement_modifiers(&self, flavor: Flavor) -> StatementModifiers {
        StatementModifiers {
            allow_unsafe: self.allow_unsafe,
            partitioning: self.partitioning,
            algorithm_clause: self.alter_algorithm,
            lock_clause: self.alter_lock,
            strict_index_order: self.exact_match,
            strict_check_constraints: self.exact_match,
            strict_foreign_key_naming: self.exact_match,
            lax_column_order: self.lax_column_order,
            lax_comments: self.lax_comments,
            compare_metadata: self.compare_metadata,
            virtual_col_validation: self.alter_validate_virtual,
            flavor: Some(flavor),
            ..StatementModifiers::default()
        }
    }
}
