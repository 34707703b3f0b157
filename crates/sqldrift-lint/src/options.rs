//! Per-directory lint configuration

use std::collections::{HashMap, HashSet};

use sqldrift_core::{NameCaseMode, ObjectKey};

use crate::note::Severity;

/// Configuration consumed by the checker pass. Rule-specific allow-lists
/// live here and are read by the rules that declare the related option.
#[derive(Debug, Clone)]
pub struct LintOptions {
    /// Per-rule severity overrides, keyed by rule name
    pub severity_overrides: HashMap<String, Severity>,
    /// Storage engines considered acceptable (`allow-engine`)
    pub allowed_engines: Vec<String>,
    /// Character sets considered acceptable (`allow-charset`)
    pub allowed_charsets: Vec<String>,
    /// Definer patterns, with `%`/`_` wildcards (`allow-definer`). Empty
    /// means any definer is acceptable.
    pub allowed_definers: Vec<String>,
    /// Objects excluded from linting entirely
    pub ignored_keys: HashSet<ObjectKey>,
    /// Restrict checking to these objects (the applier passes the keys of
    /// modified objects); `None` checks everything
    pub only_keys: Option<HashSet<ObjectKey>>,
    /// Flatten multi-line messages to one line
    pub strip_newlines: bool,
    /// The target servers' name-case handling
    pub name_case: NameCaseMode,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            severity_overrides: HashMap::new(),
            allowed_engines: vec!["InnoDB".to_string()],
            allowed_charsets: vec!["utf8mb4".to_string()],
            allowed_definers: Vec::new(),
            ignored_keys: HashSet::new(),
            only_keys: None,
            strip_newlines: false,
            name_case: NameCaseMode::AsIs,
        }
    }
}

impl LintOptions {
    /// Whether this object should be checked at all.
    pub fn covers(&self, key: &ObjectKey) -> bool {
        if self.ignored_keys.contains(key) {
            return false;
        }
        match &self.only_keys {
            Some(keys) => keys.contains(key),
            None => true,
        }
    }

    /// Effective severity for a rule.
    pub fn severity_for(&self, rule_name: &str, default: Severity) -> Severity {
        self.severity_overrides
            .get(rule_name)
            .copied()
            .unwrap_or(default)
    }
}
