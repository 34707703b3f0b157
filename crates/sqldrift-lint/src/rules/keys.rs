//! Rules about primary keys, indexes, and foreign keys

use sqldrift_core::{Schema, Statement, Table, quote_ident};

use crate::note::{Note, Severity};
use crate::options::LintOptions;
use crate::registry::{Checker, Rule, register_rule};
use crate::rules::line_offset_of;

pub(crate) fn register() {
    register_rule(Rule {
        name: "pk",
        description: "Flag tables without a primary key",
        default_severity: Severity::Warning,
        related_option: None,
        checker: Checker::Table(check_pk),
    });
    register_rule(Rule {
        name: "pk-type",
        description: "Flag primary keys whose columns are not unsigned integers",
        default_severity: Severity::Ignore,
        related_option: None,
        checker: Checker::Table(check_pk_type),
    });
    register_rule(Rule {
        name: "dupe-index",
        description: "Flag duplicate or redundant indexes",
        default_severity: Severity::Warning,
        related_option: None,
        checker: Checker::Table(check_dupe_index),
    });
    register_rule(Rule {
        name: "fk-parent",
        description: "Flag foreign keys whose parent table or columns are missing",
        default_severity: Severity::Warning,
        related_option: None,
        checker: Checker::Table(check_fk_parent),
    });
    register_rule(Rule {
        name: "has-fk",
        description: "Flag tables using foreign keys",
        default_severity: Severity::Ignore,
        related_option: None,
        checker: Checker::Table(check_has_fk),
    });
}

fn check_pk(
    table: &Table,
    _statement: &Statement,
    _schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    if table.primary_key().is_some() {
        return Vec::new();
    }
    vec![Note::new(
        "missing primary key",
        format!(
            "Table {} has no primary key; row-based replication and online schema change tools require one",
            quote_ident(&table.name)
        ),
    )]
}

fn check_pk_type(
    table: &Table,
    statement: &Statement,
    _schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    let Some(pk) = table.primary_key() else {
        return Vec::new();
    };
    let mut notes = Vec::new();
    for part in &pk.parts {
        let Some(column) = table.column(&part.column) else {
            continue;
        };
        let lower = column.type_definition.to_lowercase();
        let int_unsigned = lower.contains("unsigned")
            && ["tinyint", "smallint", "mediumint", "int", "bigint"]
                .iter()
                .any(|p| lower.starts_with(p));
        if !int_unsigned {
            notes.push(
                Note::new(
                    format!("pk column {}", column.name),
                    format!(
                        "Primary key column {}.{} uses {}; unsigned integer keys keep indexes compact",
                        quote_ident(&table.name),
                        quote_ident(&column.name),
                        column.type_definition
                    ),
                )
                .with_line_offset(line_offset_of(&statement.text, &column.name)),
            );
        }
    }
    notes
}

fn check_dupe_index(
    table: &Table,
    statement: &Statement,
    _schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    let indexes: Vec<_> = table.secondary_indexes().collect();
    let mut notes = Vec::new();
    for (i, index) in indexes.iter().enumerate() {
        for other in &indexes[i + 1..] {
            if index.signature() == other.signature() {
                notes.push(
                    Note::new(
                        format!("duplicate index {}", other.name),
                        format!(
                            "Index {} on table {} duplicates index {}",
                            quote_ident(&other.name),
                            quote_ident(&table.name),
                            quote_ident(&index.name)
                        ),
                    )
                    .with_line_offset(line_offset_of(&statement.text, &other.name)),
                );
            } else if is_prefix_redundant(index, other) {
                notes.push(
                    Note::new(
                        format!("redundant index {}", index.name),
                        format!(
                            "Index {} on table {} is a prefix of index {} and adds no selectivity",
                            quote_ident(&index.name),
                            quote_ident(&table.name),
                            quote_ident(&other.name)
                        ),
                    )
                    .with_line_offset(line_offset_of(&statement.text, &index.name)),
                );
            }
        }
    }
    notes
}

/// `a` is redundant when its parts are a leading prefix of `b`'s and it
/// adds no uniqueness guarantee of its own.
fn is_prefix_redundant(a: &sqldrift_core::Index, b: &sqldrift_core::Index) -> bool {
    !a.unique && a.parts.len() < b.parts.len() && b.parts[..a.parts.len()] == a.parts[..]
}

fn check_fk_parent(
    table: &Table,
    statement: &Statement,
    schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    let mut notes = Vec::new();
    for fk in &table.foreign_keys {
        if fk.referenced_schema.is_some() {
            // Cross-schema parents cannot be validated here
            continue;
        }
        match schema.table(&fk.referenced_table) {
            None => notes.push(
                Note::new(
                    format!("missing fk parent {}", fk.referenced_table),
                    format!(
                        "Foreign key {} on table {} references table {}, which does not exist in this schema",
                        quote_ident(&fk.name),
                        quote_ident(&table.name),
                        quote_ident(&fk.referenced_table)
                    ),
                )
                .with_line_offset(line_offset_of(&statement.text, &fk.name)),
            ),
            Some(parent) => {
                for column in &fk.referenced_columns {
                    if parent.column(column).is_none() {
                        notes.push(
                            Note::new(
                                format!("missing fk parent column {column}"),
                                format!(
                                    "Foreign key {} on table {} references {}.{}, which does not exist",
                                    quote_ident(&fk.name),
                                    quote_ident(&table.name),
                                    quote_ident(&fk.referenced_table),
                                    quote_ident(column)
                                ),
                            )
                            .with_line_offset(line_offset_of(&statement.text, &fk.name)),
                        );
                    }
                }
            }
        }
    }
    notes
}

fn check_has_fk(
    table: &Table,
    statement: &Statement,
    _schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    table
        .foreign_keys
        .iter()
        .map(|fk| {
            Note::new(
                format!("foreign key {}", fk.name),
                format!(
                    "Table {} declares foreign key {}; foreign keys serialize DDL and complicate sharding",
                    quote_ident(&table.name),
                    quote_ident(&fk.name)
                ),
            )
            .with_line_offset(line_offset_of(&statement.text, &fk.name))
        })
        .collect()
}
