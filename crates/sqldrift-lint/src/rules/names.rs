//! Rules about object naming

use sqldrift_core::{ObjectKey, Schema, Statement, Table, quote_ident};

use crate::note::{Note, Severity};
use crate::options::LintOptions;
use crate::registry::{Checker, Rule, register_rule};
use crate::rules::line_offset_of;

/// Words reserved by current MySQL/MariaDB versions that commonly trip up
/// schema designs. Not exhaustive; limited to words usable as bare
/// identifiers by older versions.
const RESERVED_WORDS: &[&str] = &[
    "add", "all", "alter", "analyze", "and", "as", "asc", "between", "bigint", "binary", "blob",
    "both", "by", "case", "change", "char", "character", "check", "collate", "column", "condition",
    "constraint", "continue", "convert", "create", "cross", "cube", "current_date", "current_time",
    "current_timestamp", "current_user", "database", "decimal", "declare", "default", "delete",
    "desc", "describe", "distinct", "div", "double", "drop", "else", "enclosed", "exists", "exit",
    "explain", "false", "fetch", "float", "for", "force", "foreign", "from", "function", "grant",
    "group", "groups", "having", "if", "ignore", "in", "index", "inner", "insert", "int",
    "integer", "interval", "into", "is", "join", "key", "keys", "kill", "lateral", "leading",
    "left", "like", "limit", "lock", "long", "match", "mod", "natural", "not", "null", "numeric",
    "of", "on", "optimize", "option", "or", "order", "outer", "over", "partition", "precision",
    "primary", "procedure", "range", "rank", "read", "recursive", "references", "regexp", "rename",
    "repeat", "replace", "require", "restrict", "return", "revoke", "right", "row", "rows",
    "schema", "select", "set", "show", "smallint", "spatial", "sql", "system", "table", "then",
    "to", "trailing", "trigger", "true", "union", "unique", "unsigned", "update", "usage", "use",
    "using", "values", "varbinary", "varchar", "when", "where", "while", "window", "with", "write",
];

pub(crate) fn register() {
    register_rule(Rule {
        name: "name-case",
        description: "Flag mixed-case object names on servers that lowercase names",
        default_severity: Severity::Warning,
        related_option: None,
        checker: Checker::Generic(check_name_case),
    });
    register_rule(Rule {
        name: "reserved-word",
        description: "Flag table and column names that are reserved words",
        default_severity: Severity::Warning,
        related_option: None,
        checker: Checker::Table(check_reserved_word),
    });
}

fn check_name_case(
    key: &ObjectKey,
    _statement: &Statement,
    _schema: &Schema,
    opts: &LintOptions,
) -> Vec<Note> {
    if !opts.name_case.is_insensitive() || !key.name.chars().any(|c| c.is_ascii_uppercase()) {
        return Vec::new();
    }
    vec![Note::new(
        format!("mixed-case name {}", key.name),
        format!(
            "Name {} contains uppercase letters, but the target servers fold names to lowercase; \
             the name will not survive a round trip",
            quote_ident(&key.name)
        ),
    )]
}

fn check_reserved_word(
    table: &Table,
    statement: &Statement,
    _schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    let mut notes = Vec::new();
    if is_reserved(&table.name) {
        notes.push(Note::new(
            format!("reserved word {}", table.name),
            format!(
                "Table name {} is a reserved word and must always be quoted",
                quote_ident(&table.name)
            ),
        ));
    }
    for column in &table.columns {
        if is_reserved(&column.name) {
            notes.push(
                Note::new(
                    format!("reserved word {}", column.name),
                    format!(
                        "Column name {}.{} is a reserved word and must always be quoted",
                        quote_ident(&table.name),
                        quote_ident(&column.name)
                    ),
                )
                .with_line_offset(line_offset_of(&statement.text, &column.name)),
            );
        }
    }
    notes
}

fn is_reserved(name: &str) -> bool {
    let lower = name.to_lowercase();
    RESERVED_WORDS.binary_search(&lower.as_str()).is_ok()
}
