//! Session parameter handling for connection pools

use std::fmt;

use crate::error::{Error, Result};

/// Session variables the engine manages itself; user-supplied
/// connect-options may not override them.
const RESERVED_OPTIONS: &[&str] = &["autocommit", "sql_log_bin", "foreign_key_checks"];

/// An ordered set of session variables applied to every connection in a
/// pool via init statements.
///
/// Parameter sets participate in pool-cache keys, so two pools against the
/// same server with different session parameters never share connections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionParams {
    params: Vec<(String, String)>,
}

impl SessionParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `connect-options` string of comma-separated `name=value`
    /// session variables. Values may be quoted with single quotes to
    /// protect embedded commas.
    pub fn parse(input: &str) -> Result<Self> {
        let mut params = Self::new();
        for part in split_respecting_quotes(input) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (name, value) = part.split_once('=').ok_or_else(|| {
                Error::Config(format!("connect-options: '{part}' is not name=value"))
            })?;
            let name = name.trim();
            if RESERVED_OPTIONS.contains(&name.to_lowercase().as_str()) {
                return Err(Error::Config(format!(
                    "connect-options may not set '{name}'; it is managed automatically"
                )));
            }
            params.set(name, value.trim());
        }
        Ok(params)
    }

    /// Set a variable, replacing any prior value for the same name.
    pub fn set(&mut self, name: &str, value: &str) {
        if let Some(entry) = self.params.iter_mut().find(|(n, _)| n == name) {
            entry.1 = value.to_string();
        } else {
            self.params.push((name.to_string(), value.to_string()));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns a copy with `other`'s variables layered on top.
    pub fn merged_with(&self, other: &SessionParams) -> SessionParams {
        let mut merged = self.clone();
        for (name, value) in other.iter() {
            merged.set(name, value);
        }
        merged
    }

    /// Canonical signature used in pool-cache keys. Name order does not
    /// affect the signature.
    pub fn signature(&self) -> String {
        let mut pairs: Vec<String> = self
            .params
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect();
        pairs.sort();
        pairs.join(",")
    }

    /// SET statements executed on each fresh connection.
    pub fn init_statements(&self) -> Vec<String> {
        self.params
            .iter()
            .map(|(name, value)| format!("SET SESSION {name} = {value}"))
            .collect()
    }
}

impl fmt::Display for SessionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

fn split_respecting_quotes(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in input.chars() {
        match c {
            '\'' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

#[cfg(test)]
mod tests;
