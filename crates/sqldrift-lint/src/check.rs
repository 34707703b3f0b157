//! The checker pass: run every enabled rule over a desired schema

use sqldrift_core::{LogicalSchema, Schema};

use crate::note::{Annotation, LintResult, Severity};
use crate::options::LintOptions;
use crate::registry::{Checker, all_rules};

/// Lint a materialized desired schema.
///
/// Iterates over the desired-state CREATE statements, looks up each
/// object's introspected form, and runs every enabled rule matching the
/// object's type. Objects that failed to materialize are skipped: they
/// already carry execution errors.
pub fn check_schema(logical: &LogicalSchema, schema: &Schema, opts: &LintOptions) -> LintResult {
    let rules = all_rules();
    let mut result = LintResult::default();

    for (key, statement) in &logical.creates {
        if !opts.covers(key) {
            continue;
        }
        for rule in &rules {
            let severity = opts.severity_for(rule.name, rule.default_severity);
            if severity == Severity::Ignore {
                continue;
            }
            let notes = match &rule.checker {
                Checker::Table(check) => {
                    if key.object_type != sqldrift_core::ObjectType::Table {
                        continue;
                    }
                    match schema.table(&key.name) {
                        Some(table) => check(table, statement, schema, opts),
                        None => continue,
                    }
                }
                Checker::Routine(check) => {
                    if !key.object_type.is_stored_program() {
                        continue;
                    }
                    match schema.routine(key.object_type, &key.name) {
                        Some(routine) => check(routine, statement, schema, opts),
                        None => continue,
                    }
                }
                Checker::Generic(check) => {
                    if !schema.contains(key) {
                        continue;
                    }
                    check(key, statement, schema, opts)
                }
            };
            for note in notes {
                result.annotations.push(Annotation {
                    rule_name: rule.name.to_string(),
                    severity,
                    statement: statement.clone(),
                    note,
                });
            }
        }
    }

    tracing::debug!(
        annotations = result.annotations.len(),
        errors = result.error_count(),
        "lint pass complete"
    );
    result
}
