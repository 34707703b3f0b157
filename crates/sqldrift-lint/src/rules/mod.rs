//! Built-in lint rules

mod columns;
mod keys;
mod names;
mod routines;
mod storage;

/// Register every built-in rule. Idempotent.
pub(crate) fn register_builtin_rules() {
    storage::register();
    columns::register();
    keys::register();
    names::register();
    routines::register();
}

/// Line offset of the first statement line naming `identifier`, so notes
/// can point at the column or clause that triggered them. Prefers the
/// backtick-quoted form to avoid matching inside longer names.
pub(crate) fn line_offset_of(statement_text: &str, identifier: &str) -> usize {
    let quoted = format!("`{identifier}`");
    statement_text
        .lines()
        .position(|line| line.contains(&quoted))
        .or_else(|| {
            statement_text
                .lines()
                .position(|line| line.contains(identifier))
        })
        .unwrap_or(0)
}
