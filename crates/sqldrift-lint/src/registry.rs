//! Process-wide lint rule registry

use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::RwLock;

use sqldrift_core::{ObjectKey, Routine, Schema, Statement, Table};

use crate::note::{Note, Severity};
use crate::options::LintOptions;

/// A rule's checker, dispatched by the type of object being inspected.
#[derive(Clone, Copy)]
pub enum Checker {
    Table(fn(&Table, &Statement, &Schema, &LintOptions) -> Vec<Note>),
    Routine(fn(&Routine, &Statement, &Schema, &LintOptions) -> Vec<Note>),
    /// Applies to every object kind
    Generic(fn(&ObjectKey, &Statement, &Schema, &LintOptions) -> Vec<Note>),
}

impl std::fmt::Debug for Checker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Checker::Table(_) => "Checker::Table",
            Checker::Routine(_) => "Checker::Routine",
            Checker::Generic(_) => "Checker::Generic",
        })
    }
}

/// A registered lint rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pub description: &'static str,
    pub default_severity: Severity,
    /// Name of the configuration option this rule reads, if any
    pub related_option: Option<&'static str>,
    pub checker: Checker,
}

static REGISTRY: LazyLock<RwLock<HashMap<&'static str, Rule>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register one rule, replacing any rule of the same name.
pub fn register_rule(rule: Rule) {
    tracing::debug!(rule = rule.name, "registering lint rule");
    REGISTRY.write().insert(rule.name, rule);
}

/// Register the built-in rule set. Idempotent; call once from main before
/// linting.
pub fn register_all_rules() {
    crate::rules::register_builtin_rules();
}

/// Snapshot of all registered rules, sorted by name for deterministic
/// output.
pub fn all_rules() -> Vec<Rule> {
    let mut rules: Vec<Rule> = REGISTRY.read().values().cloned().collect();
    rules.sort_by_key(|r| r.name);
    rules
}

pub fn rule_by_name(name: &str) -> Option<Rule> {
    REGISTRY.read().get(name).cloned()
}
