//! Routine diff helpers
//!
//! Stored programs cannot be altered in place for body or signature
//! changes, so a changed routine diffs into a DROP followed by a CREATE.

use sqldrift_core::Routine;

/// True when two routines differ only in creation-time metadata
/// (sql_mode, definer). Such differences are reconciled only under the
/// compare-metadata modifier.
pub(crate) fn metadata_only_change(from: &Routine, to: &Routine) -> bool {
    from.equals_ignoring_definer(to) && (from.definer != to.definer || from.sql_mode != to.sql_mode)
}

/// True when the routines differ at all, metadata included.
pub(crate) fn routines_differ(from: &Routine, to: &Routine) -> bool {
    !from.equals_ignoring_definer(to) || from.definer != to.definer || from.sql_mode != to.sql_mode
}

/// Render the DROP statement for a routine.
pub(crate) fn generate_drop(routine: &Routine) -> String {
    format!(
        "DROP {} {}",
        routine.object_type.keyword(),
        sqldrift_core::quote_ident(&routine.name)
    )
}

/// Render the CREATE statement for a routine, as introspected.
pub(crate) fn generate_create(routine: &Routine) -> String {
    routine.create_statement.clone()
}
