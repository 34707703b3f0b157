//! Rules about storage engines, character sets, and row formats

use sqldrift_core::{Schema, Statement, Table, quote_ident};

use crate::note::{Note, Severity};
use crate::options::LintOptions;
use crate::registry::{Checker, Rule, register_rule};

pub(crate) fn register() {
    register_rule(Rule {
        name: "engine",
        description: "Flag tables using a storage engine outside the allowed list",
        default_severity: Severity::Warning,
        related_option: Some("allow-engine"),
        checker: Checker::Table(check_engine),
    });
    register_rule(Rule {
        name: "charset",
        description: "Flag tables using a character set outside the allowed list",
        default_severity: Severity::Warning,
        related_option: Some("allow-charset"),
        checker: Checker::Table(check_charset),
    });
    register_rule(Rule {
        name: "compression",
        description: "Flag tables using row compression",
        default_severity: Severity::Ignore,
        related_option: None,
        checker: Checker::Table(check_compression),
    });
}

fn check_engine(
    table: &Table,
    _statement: &Statement,
    _schema: &Schema,
    opts: &LintOptions,
) -> Vec<Note> {
    if opts.allowed_engines.is_empty()
        || opts
            .allowed_engines
            .iter()
            .any(|e| e.eq_ignore_ascii_case(&table.engine))
    {
        return Vec::new();
    }
    vec![Note::new(
        format!("engine {}", table.engine),
        format!(
            "Table {} uses storage engine {}, which is not in the allowed list ({})",
            quote_ident(&table.name),
            table.engine,
            opts.allowed_engines.join(", ")
        ),
    )]
}

fn check_charset(
    table: &Table,
    _statement: &Statement,
    _schema: &Schema,
    opts: &LintOptions,
) -> Vec<Note> {
    if opts.allowed_charsets.is_empty()
        || opts
            .allowed_charsets
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&table.charset))
    {
        return Vec::new();
    }
    vec![Note::new(
        format!("charset {}", table.charset),
        format!(
            "Table {} uses character set {}, which is not in the allowed list ({})",
            quote_ident(&table.name),
            table.charset,
            opts.allowed_charsets.join(", ")
        ),
    )]
}

fn check_compression(
    table: &Table,
    _statement: &Statement,
    _schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    let compressed = table
        .row_format
        .as_deref()
        .is_some_and(|f| f.eq_ignore_ascii_case("COMPRESSED"))
        || table.create_statement.contains("KEY_BLOCK_SIZE");
    if !compressed {
        return Vec::new();
    }
    vec![Note::new(
        "compressed table",
        format!(
            "Table {} uses row compression; compressed tables trade CPU for storage and can slow DDL",
            quote_ident(&table.name)
        ),
    )]
}
