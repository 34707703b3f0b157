//! ALTER TABLE clause generation

use std::collections::HashMap;

use sqldrift_core::{CheckConstraint, Column, Table, quote_ident, strip_auto_inc_clause};

use crate::diff::StatementError;
use crate::modifiers::{NextAutoInc, PartitioningMode, StatementModifiers};

/// Everything produced while rendering one table alter: the SQL (possibly
/// empty for a no-op) plus the reasons it is unsafe or unsupported.
pub(crate) struct BuiltAlter {
    pub sql: String,
    pub unsafe_reasons: Vec<String>,
    pub unsupported_reasons: Vec<String>,
}

/// Structural equality of two tables, ignoring the verbatim CREATE text.
/// Differing auto-increment counters still count as a difference; whether
/// that renders to any SQL is decided by the next-auto-inc modifier.
pub(crate) fn tables_equal(from: &Table, to: &Table) -> bool {
    let mut a = from.clone();
    let mut b = to.clone();
    a.create_statement = String::new();
    b.create_statement = String::new();
    a == b
}

/// Render a CREATE TABLE statement under the given modifiers.
pub(crate) fn generate_create(table: &Table, mods: &StatementModifiers) -> String {
    let mut create = table.create_statement.clone();
    if mods.next_auto_inc == NextAutoInc::Ignore {
        create = strip_auto_inc_clause(&create);
    }
    if mods.partitioning == PartitioningMode::Remove
        && let Some(partitioning) = &table.partitioning
        && let Some(pos) = create.find(partitioning.as_str())
    {
        create.truncate(pos);
        let trimmed = create.trim_end().trim_end_matches("/*!50100").trim_end();
        create.truncate(trimmed.len());
    }
    create
}

/// Names of same-name foreign keys whose structure changed. These must be
/// dropped in a separate, earlier ALTER because the server rejects
/// dropping and re-adding one constraint name in a single statement.
pub(crate) fn modified_foreign_key_names(from: &Table, to: &Table) -> Vec<String> {
    from.foreign_keys
        .iter()
        .filter(|from_fk| {
            to.foreign_key(&from_fk.name)
                .is_some_and(|to_fk| to_fk.signature() != from_fk.signature())
        })
        .map(|fk| fk.name.clone())
        .collect()
}

/// Render the early ALTER that drops modified foreign keys.
pub(crate) fn generate_fk_pre_drop(from: &Table, to: &Table) -> String {
    let names = modified_foreign_key_names(from, to);
    if names.is_empty() {
        return String::new();
    }
    let clauses = names
        .iter()
        .map(|n| format!("DROP FOREIGN KEY {}", quote_ident(n)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("ALTER TABLE {} {clauses}", quote_ident(&from.name))
}

/// Generate the ALTER TABLE reconciling `from` to `to`.
pub(crate) fn generate_alter(
    from: &Table,
    to: &Table,
    mods: &StatementModifiers,
) -> BuiltAlter {
    let mut clauses: Vec<String> = Vec::new();
    let mut unsafe_reasons: Vec<String> = Vec::new();
    let mut unsupported_reasons: Vec<String> = Vec::new();

    diff_columns(from, to, mods, &mut clauses, &mut unsafe_reasons);
    diff_indexes(from, to, mods, &mut clauses);
    diff_foreign_keys(from, to, mods, &mut clauses);
    diff_checks(from, to, mods, &mut clauses);

    if from.engine != to.engine {
        clauses.push(format!("ENGINE={}", to.engine));
    }
    if from.charset != to.charset || from.collation != to.collation {
        clauses.push(format!(
            "DEFAULT CHARACTER SET {} COLLATE {}",
            to.charset, to.collation
        ));
    }
    if from.row_format != to.row_format
        && let Some(row_format) = &to.row_format
    {
        clauses.push(format!("ROW_FORMAT={row_format}"));
    }
    if !mods.lax_comments && from.comment != to.comment {
        clauses.push(format!(
            "COMMENT '{}'",
            sqldrift_core::escape_literal(to.comment.as_deref().unwrap_or(""))
        ));
    }

    diff_auto_increment(from, to, mods, &mut clauses);
    diff_partitioning(from, to, mods, &mut clauses);

    // A structural mismatch on a non-InnoDB table cannot be diffed
    // faithfully: storage-engine specific attributes are not modeled.
    let structural = !clauses.is_empty();
    if structural && (from.engine != "InnoDB" || to.engine != "InnoDB") {
        unsupported_reasons.push(format!(
            "table {} uses engine {}; only InnoDB alters are generated faithfully",
            quote_ident(&from.name),
            if from.engine != "InnoDB" { &from.engine } else { &to.engine }
        ));
    }

    let sql = if clauses.is_empty() {
        String::new()
    } else {
        let mut sql = format!("ALTER TABLE {} {}", quote_ident(&from.name), clauses.join(", "));
        if let Some(algorithm) = mods.algorithm_clause.as_sql() {
            sql.push_str(&format!(", ALGORITHM={algorithm}"));
        }
        if let Some(lock) = mods.lock_clause.as_sql() {
            sql.push_str(&format!(", LOCK={lock}"));
        }
        sql
    };

    BuiltAlter {
        sql,
        unsafe_reasons,
        unsupported_reasons,
    }
}

impl BuiltAlter {
    /// Apply the safety gate: unsupported wins over unsafe, and unsafe is
    /// waived by allow-unsafe.
    pub(crate) fn into_result(
        self,
        mods: &StatementModifiers,
    ) -> Result<String, StatementError> {
        if let Some(reason) = self.unsupported_reasons.into_iter().next() {
            return Err(StatementError::Unsupported {
                sql: self.sql,
                reason,
            });
        }
        if !mods.allow_unsafe
            && let Some(reason) = self.unsafe_reasons.into_iter().next()
        {
            return Err(StatementError::Unsafe {
                sql: self.sql,
                reason,
            });
        }
        Ok(self.sql)
    }
}

fn diff_columns(
    from: &Table,
    to: &Table,
    mods: &StatementModifiers,
    clauses: &mut Vec<String>,
    unsafe_reasons: &mut Vec<String>,
) {
    let from_map: HashMap<&str, &Column> =
        from.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let to_map: HashMap<&str, &Column> = to.columns.iter().map(|c| (c.name.as_str(), c)).collect();

    for from_col in &from.columns {
        if !to_map.contains_key(from_col.name.as_str()) {
            clauses.push(format!("DROP COLUMN {}", quote_ident(&from_col.name)));
            unsafe_reasons.push(format!(
                "dropping column {} destroys its data",
                quote_ident(&from_col.name)
            ));
        }
    }

    let mut previous: Option<&str> = None;
    for to_col in &to.columns {
        match from_map.get(to_col.name.as_str()) {
            None => {
                let mut clause = format!("ADD COLUMN {}", render_column(to_col, to, mods));
                if !mods.lax_column_order {
                    clause.push_str(&position_clause(previous));
                }
                clauses.push(clause);
            }
            Some(from_col) => {
                let changed = render_column(from_col, from, mods) != render_column(to_col, to, mods);
                let moved = !mods.lax_column_order
                    && common_predecessor(from, &to_col.name, &to_map)
                        != common_predecessor(to, &to_col.name, &from_map);
                if changed || moved {
                    let mut clause = format!("MODIFY COLUMN {}", render_column(to_col, to, mods));
                    if moved {
                        clause.push_str(&position_clause(previous));
                    }
                    if mods.virtual_col_validation && to_col.generation_expression.is_some() {
                        clause.push_str(" /* WITH VALIDATION */");
                    }
                    if changed && !is_safe_type_change(&from_col.type_definition, &to_col.type_definition)
                    {
                        unsafe_reasons.push(format!(
                            "changing column {} from {} to {} may truncate or destroy values",
                            quote_ident(&to_col.name),
                            from_col.type_definition,
                            to_col.type_definition
                        ));
                    }
                    clauses.push(clause);
                }
            }
        }
        previous = Some(to_col.name.as_str());
    }
}

/// Render one column definition, normalizing redundant column-level
/// charset clauses unless strict column definitions are requested.
fn render_column(column: &Column, table: &Table, mods: &StatementModifiers) -> String {
    let mut column = column.clone();
    if !mods.strict_column_definition
        && column.charset.as_deref() == Some(table.charset.as_str())
        && column.collation.as_deref() == Some(table.collation.as_str())
    {
        column.charset = None;
        column.collation = None;
    }
    if mods.lax_comments {
        column.comment = None;
    }
    column.definition()
}

fn position_clause(previous: Option<&str>) -> String {
    match previous {
        Some(name) => format!(" AFTER {}", quote_ident(name)),
        None => " FIRST".to_string(),
    }
}

/// The nearest preceding column that also exists on the other side, used
/// to detect repositioned columns without being confused by adds/drops.
fn common_predecessor<'a>(
    table: &'a Table,
    column: &str,
    other_side: &HashMap<&str, &Column>,
) -> Option<&'a str> {
    let position = table.columns.iter().position(|c| c.name == column)?;
    table.columns[..position]
        .iter()
        .rev()
        .map(|c| c.name.as_str())
        .find(|name| other_side.contains_key(name))
}

/// Ordered widths per type family. A change within one family to a higher
/// rank is loss-free; anything else is treated as potentially destructive.
fn is_safe_type_change(from_type: &str, to_type: &str) -> bool {
    if from_type == to_type {
        return true;
    }
    const INT_FAMILY: &[&str] = &["tinyint", "smallint", "mediumint", "int", "bigint"];
    const TEXT_FAMILY: &[&str] = &["tinytext", "text", "mediumtext", "longtext"];
    const BLOB_FAMILY: &[&str] = &["tinyblob", "blob", "mediumblob", "longblob"];

    let (from_base, from_len) = split_type(from_type);
    let (to_base, to_len) = split_type(to_type);

    // varchar/char/varbinary length growth is safe
    if from_base == to_base
        && matches!(from_base.as_str(), "varchar" | "char" | "binary" | "varbinary")
        && let (Some(from_len), Some(to_len)) = (from_len, to_len)
    {
        return to_len >= from_len;
    }

    for family in [INT_FAMILY, TEXT_FAMILY, BLOB_FAMILY] {
        let from_rank = family.iter().position(|t| *t == from_base);
        let to_rank = family.iter().position(|t| *t == to_base);
        if let (Some(from_rank), Some(to_rank)) = (from_rank, to_rank) {
            // signedness change within the int family is lossy
            if family == INT_FAMILY
                && from_type.contains("unsigned") != to_type.contains("unsigned")
            {
                return false;
            }
            return to_rank >= from_rank;
        }
    }

    false
}

fn split_type(type_definition: &str) -> (String, Option<u64>) {
    let lower = type_definition.to_lowercase();
    match lower.split_once('(') {
        Some((base, rest)) => {
            let len = rest
                .split(')')
                .next()
                .and_then(|l| l.split(',').next())
                .and_then(|l| l.trim().parse().ok());
            (base.trim().to_string(), len)
        }
        None => (
            lower.split_whitespace().next().unwrap_or("").to_string(),
            None,
        ),
    }
}

fn diff_indexes(
    from: &Table,
    to: &Table,
    mods: &StatementModifiers,
    clauses: &mut Vec<String>,
) {
    let to_names: Vec<&str> = to
        .secondary_indexes()
        .map(|i| i.name.as_str())
        .collect();

    for from_idx in from.secondary_indexes() {
        match to.index(&from_idx.name) {
            None => clauses.push(format!("DROP KEY {}", quote_ident(&from_idx.name))),
            Some(to_idx) if to_idx.signature() != from_idx.signature() => {
                clauses.push(format!("DROP KEY {}", quote_ident(&from_idx.name)));
                clauses.push(format!("ADD {}", to_idx.definition()));
            }
            Some(_) => {}
        }
    }
    for to_idx in to.secondary_indexes() {
        if from.index(&to_idx.name).is_none() {
            clauses.push(format!("ADD {}", to_idx.definition()));
        }
    }

    // Under strict ordering, indexes that survive unchanged but sit in a
    // different relative position are re-created to force the order.
    if mods.strict_index_order {
        let from_names: Vec<&str> = from
            .secondary_indexes()
            .filter(|i| to.index(&i.name).is_some())
            .map(|i| i.name.as_str())
            .collect();
        let to_common: Vec<&str> = to_names
            .iter()
            .copied()
            .filter(|n| from.index(n).is_some())
            .collect();
        if from_names != to_common {
            for name in to_common {
                if let Some(index) = to.index(name)
                    && from.index(name).is_some_and(|f| f.signature() == index.signature())
                {
                    clauses.push(format!("DROP KEY {}", quote_ident(name)));
                    clauses.push(format!("ADD {}", index.definition()));
                }
            }
        }
    }

    match (from.primary_key(), to.primary_key()) {
        (Some(_), None) => clauses.push("DROP PRIMARY KEY".to_string()),
        (None, Some(pk)) => clauses.push(format!("ADD {}", pk.definition())),
        (Some(from_pk), Some(to_pk)) if from_pk.parts != to_pk.parts => {
            clauses.push("DROP PRIMARY KEY".to_string());
            clauses.push(format!("ADD {}", to_pk.definition()));
        }
        _ => {}
    }
}

fn diff_foreign_keys(
    from: &Table,
    to: &Table,
    mods: &StatementModifiers,
    clauses: &mut Vec<String>,
) {
    let modified = modified_foreign_key_names(from, to);

    for from_fk in &from.foreign_keys {
        match to.foreign_key(&from_fk.name) {
            None => {
                // Without strict naming, a renamed but structurally
                // identical constraint is left alone.
                let renamed_equivalent = !mods.strict_foreign_key_naming
                    && to
                        .foreign_keys
                        .iter()
                        .any(|to_fk| to_fk.signature() == from_fk.signature());
                if !renamed_equivalent {
                    clauses.push(format!("DROP FOREIGN KEY {}", quote_ident(&from_fk.name)));
                }
            }
            Some(_) if modified.contains(&from_fk.name) && mods.skip_pre_drop_alters => {
                // No earlier ALTER dropped it, so drop it here.
                clauses.push(format!("DROP FOREIGN KEY {}", quote_ident(&from_fk.name)));
            }
            Some(_) => {}
        }
    }

    for to_fk in &to.foreign_keys {
        let add_needed = match from.foreign_key(&to_fk.name) {
            None => {
                !(!mods.strict_foreign_key_naming
                    && from
                        .foreign_keys
                        .iter()
                        .any(|from_fk| from_fk.signature() == to_fk.signature()))
            }
            Some(from_fk) => from_fk.signature() != to_fk.signature(),
        };
        if add_needed {
            clauses.push(format!("ADD {}", to_fk.definition()));
        }
    }
}

fn diff_checks(
    from: &Table,
    to: &Table,
    mods: &StatementModifiers,
    clauses: &mut Vec<String>,
) {
    let matches = |a: &CheckConstraint, b: &CheckConstraint| {
        if mods.strict_check_constraints {
            a.name == b.name && a.clause == b.clause && a.enforced == b.enforced
        } else {
            a.clause == b.clause && a.enforced == b.enforced
        }
    };

    for from_check in &from.checks {
        if !to.checks.iter().any(|to_check| matches(from_check, to_check)) {
            clauses.push(format!("DROP CHECK {}", quote_ident(&from_check.name)));
        }
    }
    for to_check in &to.checks {
        if !from.checks.iter().any(|from_check| matches(from_check, to_check)) {
            clauses.push(format!("ADD {}", to_check.definition()));
        }
    }
}

fn diff_auto_increment(
    from: &Table,
    to: &Table,
    mods: &StatementModifiers,
    clauses: &mut Vec<String>,
) {
    let Some(to_next) = to.next_auto_increment else {
        return;
    };
    let from_next = from.next_auto_increment.unwrap_or(0);
    let emit = match mods.next_auto_inc {
        NextAutoInc::Ignore => false,
        NextAutoInc::IfIncreased => to_next > from_next,
        NextAutoInc::Always => to_next != from_next,
    };
    if emit {
        clauses.push(format!("AUTO_INCREMENT={to_next}"));
    }
}

fn diff_partitioning(
    from: &Table,
    to: &Table,
    mods: &StatementModifiers,
    clauses: &mut Vec<String>,
) {
    if mods.partitioning == PartitioningMode::Permissive {
        return;
    }
    match (&from.partitioning, &to.partitioning) {
        (Some(_), None) => clauses.push("REMOVE PARTITIONING".to_string()),
        (None, Some(partitioning)) => clauses.push(partitioning.clone()),
        (Some(from_part), Some(to_part)) if from_part != to_part => {
            clauses.push(to_part.clone());
        }
        _ => {}
    }
}
