//! Desired-state bundles produced by the filesystem layer

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{ObjectKey, ObjectType};

/// One SQL statement from the desired-state tree, with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Original statement text, without a trailing delimiter
    pub text: String,
    pub file: PathBuf,
    pub line_no: usize,
    pub object_type: ObjectType,
    pub object_name: String,
    /// Schema qualifier if the statement named one (`db`.`table` form)
    pub schema_qualifier: Option<String>,
    /// True for stored-program bodies containing inner `;` terminators;
    /// these need a non-default delimiter in client output and must never
    /// be sent as part of a multi-statement batch.
    pub compound: bool,
}

impl Statement {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.object_type, &self.object_name)
    }

    /// `file:line` form used in log and lint output
    pub fn location(&self) -> String {
        format!("{}:{}", self.file.display(), self.line_no)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key(), self.location())
    }
}

/// Desired state for one schema: CREATE statements keyed by object,
/// ordered ALTER statements, and schema-level defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogicalSchema {
    /// Logical schema name, when the tree names one
    pub name: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub creates: BTreeMap<ObjectKey, Statement>,
    pub alters: Vec<Statement>,
}

impl LogicalSchema {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Insert a CREATE statement. Returns the previous statement if the
    /// object was already defined.
    pub fn add_create(&mut self, statement: Statement) -> Option<Statement> {
        self.creates.insert(statement.key(), statement)
    }

    pub fn add_alter(&mut self, statement: Statement) {
        self.alters.push(statement);
    }

    pub fn create_for(&self, key: &ObjectKey) -> Option<&Statement> {
        self.creates.get(key)
    }

    pub fn len(&self) -> usize {
        self.creates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.alters.is_empty()
    }

    /// Statements that may run batched with others: plain CREATE TABLEs.
    pub fn chunkable_creates(&self) -> impl Iterator<Item = &Statement> {
        self.creates
            .values()
            .filter(|s| s.object_type == ObjectType::Table && !s.compound)
    }

    /// Statements that must run one per round trip: stored programs and
    /// anything with a compound body.
    pub fn non_chunkable_creates(&self) -> impl Iterator<Item = &Statement> {
        self.creates
            .values()
            .filter(|s| s.object_type != ObjectType::Table || s.compound)
    }

    /// Enforce naming consistency: either the bundle is unnamed and no
    /// statement carries a schema qualifier, or it is named and every
    /// qualifier matches that name. Violations make the whole directory
    /// unusable.
    pub fn check_name_consistency(&self) -> Result<()> {
        let statements = self.creates.values().chain(self.alters.iter());
        for statement in statements {
            match (&self.name, &statement.schema_qualifier) {
                (None, Some(qualifier)) => {
                    return Err(Error::Config(format!(
                        "{} names schema '{qualifier}' but the directory does not map a named schema",
                        statement.location()
                    )));
                }
                (Some(name), Some(qualifier)) if name != qualifier => {
                    return Err(Error::Config(format!(
                        "{} names schema '{qualifier}' but the directory maps schema '{name}'",
                        statement.location()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
