//! Rules about column types and defaults

use sqldrift_core::{Schema, Statement, Table, quote_ident};

use crate::note::{Note, Severity};
use crate::options::LintOptions;
use crate::registry::{Checker, Rule, register_rule};
use crate::rules::line_offset_of;

pub(crate) fn register() {
    register_rule(Rule {
        name: "auto-inc",
        description: "Flag auto-increment columns that are signed or smaller than int",
        default_severity: Severity::Warning,
        related_option: None,
        checker: Checker::Table(check_auto_inc),
    });
    register_rule(Rule {
        name: "display-width",
        description: "Flag integer columns with deprecated display widths",
        default_severity: Severity::Ignore,
        related_option: None,
        checker: Checker::Table(check_display_width),
    });
    register_rule(Rule {
        name: "has-enum",
        description: "Flag columns using ENUM or SET types",
        default_severity: Severity::Ignore,
        related_option: None,
        checker: Checker::Table(check_has_enum),
    });
    register_rule(Rule {
        name: "has-float",
        description: "Flag columns using approximate floating-point types",
        default_severity: Severity::Ignore,
        related_option: None,
        checker: Checker::Table(check_has_float),
    });
    register_rule(Rule {
        name: "has-time",
        description: "Flag columns using time-of-day types subject to time zone handling",
        default_severity: Severity::Ignore,
        related_option: None,
        checker: Checker::Table(check_has_time),
    });
    register_rule(Rule {
        name: "zero-date",
        description: "Flag columns defaulting to zero dates",
        default_severity: Severity::Warning,
        related_option: None,
        checker: Checker::Table(check_zero_date),
    });
}

fn check_auto_inc(
    table: &Table,
    statement: &Statement,
    _schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    let mut notes = Vec::new();
    for column in table.columns.iter().filter(|c| c.auto_increment) {
        let lower = column.type_definition.to_lowercase();
        let small = lower.starts_with("tinyint")
            || lower.starts_with("smallint")
            || lower.starts_with("mediumint");
        let signed = !lower.contains("unsigned");
        if small || signed {
            notes.push(
                Note::new(
                    format!("auto-inc column {}", column.name),
                    format!(
                        "Column {}.{} is AUTO_INCREMENT but uses {}; an unsigned int or bigint avoids exhausting the key space",
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

fn check_display_width(
    table: &Table,
    statement: &Statement,
    _schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    const INT_PREFIXES: &[&str] = &["tinyint", "smallint", "mediumint", "int", "bigint"];
    let mut notes = Vec::new();
    for column in &table.columns {
        let lower = column.type_definition.to_lowercase();
        let with_width = INT_PREFIXES
            .iter()
            .any(|p| lower.starts_with(&format!("{p}(")));
        // tinyint(1) is the conventional boolean spelling; leave it be
        if with_width && !lower.starts_with("tinyint(1)") {
            notes.push(
                Note::new(
                    format!("display width on {}", column.name),
                    format!(
                        "Column {}.{} uses integer display width ({}); display widths are deprecated and ignored by modern servers",
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

fn flag_type_family(
    table: &Table,
    statement: &Statement,
    prefixes: &[&str],
    label: &str,
    advice: &str,
) -> Vec<Note> {
    let mut notes = Vec::new();
    for column in &table.columns {
        let lower = column.type_definition.to_lowercase();
        if prefixes.iter().any(|p| lower.starts_with(p)) {
            notes.push(
                Note::new(
                    format!("{label} column {}", column.name),
                    format!(
                        "Column {}.{} uses type {}; {advice}",
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

fn check_has_enum(
    table: &Table,
    statement: &Statement,
    _schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    flag_type_family(
        table,
        statement,
        &["enum(", "set("],
        "enum",
        "changing the value list later requires an ALTER of the column",
    )
}

fn check_has_float(
    table: &Table,
    statement: &Statement,
    _schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    flag_type_family(
        table,
        statement,
        &["float", "double"],
        "float",
        "approximate types cannot represent exact decimal values; consider decimal",
    )
}

fn check_has_time(
    table: &Table,
    statement: &Statement,
    _schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    flag_type_family(
        table,
        statement,
        &["time", "timestamp", "datetime"],
        "time",
        "time-of-day values depend on connection and server time zone settings",
    )
}

fn check_zero_date(
    table: &Table,
    statement: &Statement,
    _schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    let mut notes = Vec::new();
    for column in &table.columns {
        if column
            .default
            .as_deref()
            .is_some_and(|d| d.contains("0000-00-00"))
        {
            notes.push(
                Note::new(
                    format!("zero-date default on {}", column.name),
                    format!(
                        "Column {}.{} defaults to a zero date, which strict sql_mode rejects on insert",
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
