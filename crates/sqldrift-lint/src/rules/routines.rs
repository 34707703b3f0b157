//! Rules about stored routines

use regex::Regex;

use sqldrift_core::{Routine, Schema, Statement, quote_ident};

use crate::note::{Note, Severity};
use crate::options::LintOptions;
use crate::registry::{Checker, Rule, register_rule};

pub(crate) fn register() {
    register_rule(Rule {
        name: "has-routine",
        description: "Flag stored procedures and functions",
        default_severity: Severity::Ignore,
        related_option: None,
        checker: Checker::Routine(check_has_routine),
    });
    register_rule(Rule {
        name: "definer",
        description: "Flag routine definers outside the allowed list",
        default_severity: Severity::Warning,
        related_option: Some("allow-definer"),
        checker: Checker::Routine(check_definer),
    });
}

fn check_has_routine(
    routine: &Routine,
    _statement: &Statement,
    _schema: &Schema,
    _opts: &LintOptions,
) -> Vec<Note> {
    vec![Note::new(
        format!("stored {}", routine.object_type),
        format!(
            "{} {} keeps application logic on the database server, outside normal code review and deploy flows",
            routine.object_type,
            quote_ident(&routine.name)
        ),
    )]
}

fn check_definer(
    routine: &Routine,
    _statement: &Statement,
    _schema: &Schema,
    opts: &LintOptions,
) -> Vec<Note> {
    // An empty allow-list permits everything.
    if opts.allowed_definers.is_empty() {
        return Vec::new();
    }
    let allowed = opts
        .allowed_definers
        .iter()
        .any(|pattern| definer_pattern_matches(pattern, &routine.definer));
    if allowed {
        return Vec::new();
    }
    vec![Note::new(
        format!("definer {}", routine.definer),
        format!(
            "{} {} is defined by {}, which is not in the allowed definer list ({})",
            routine.object_type,
            quote_ident(&routine.name),
            routine.definer,
            opts.allowed_definers.join(", ")
        ),
    )]
}

/// Match a definer against an allow-list pattern, where `%` and `_` have
/// their SQL wildcard meanings.
fn definer_pattern_matches(pattern: &str, definer: &str) -> bool {
    let translated = regex::escape(pattern).replace('%', ".*").replace('_', ".");
    match Regex::new(&format!("^{translated}$")) {
        Ok(re) => re.is_match(definer),
        Err(_) => pattern == definer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definer_wildcards() {
        assert!(definer_pattern_matches("root@%", "root@localhost"));
        assert!(definer_pattern_matches("%@localhost", "admin@localhost"));
        assert!(definer_pattern_matches("app_user@10.0.0._", "app_user@10.0.0.7"));
        assert!(!definer_pattern_matches("root@localhost", "root@10.0.0.1"));
        assert!(!definer_pattern_matches("root@%", "admin@localhost"));
    }
}
