//! Notes and annotations produced by lint rules

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqldrift_core::{Error, Statement};

/// How a rule's findings are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ignore,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Ignore => "ignore",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(Severity::Ignore),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(Error::Config(format!("invalid lint severity '{other}'"))),
        }
    }
}

/// One finding from one rule, positioned relative to the statement that
/// defined the object.
#[derive(Debug, Clone)]
pub struct Note {
    /// Line offset within the statement text (0 = the statement's first
    /// line)
    pub line_offset: usize,
    /// Short label for one-line output
    pub summary: String,
    /// Full explanation
    pub message: String,
}

impl Note {
    pub fn new(summary: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            line_offset: 0,
            summary: summary.into(),
            message: message.into(),
        }
    }

    pub fn with_line_offset(mut self, line_offset: usize) -> Self {
        self.line_offset = line_offset;
        self
    }
}

/// A note bound to its rule, severity, and originating statement.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub rule_name: String,
    pub severity: Severity,
    pub statement: Statement,
    pub note: Note,
}

impl Annotation {
    /// `file:line` pointing at the note's line within the statement
    pub fn location(&self) -> String {
        format!(
            "{}:{}",
            self.statement.file.display(),
            self.statement.line_no + self.note.line_offset
        )
    }

    /// The full message, optionally flattened to one line.
    pub fn message_text(&self, strip_newlines: bool) -> String {
        if strip_newlines {
            self.note.message.replace('\n', " ")
        } else {
            self.note.message.clone()
        }
    }
}

/// Aggregated lint findings.
#[derive(Debug, Clone, Default)]
pub struct LintResult {
    pub annotations: Vec<Annotation>,
}

impl LintResult {
    pub fn error_count(&self) -> usize {
        self.annotations
            .iter()
            .filter(|a| a.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.annotations
            .iter()
            .filter(|a| a.severity == Severity::Warning)
            .count()
    }

    pub fn merge(&mut self, other: LintResult) {
        self.annotations.extend(other.annotations);
    }
}
