//! Statement modifiers controlling DDL generation

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqldrift_core::{Error, Flavor};

/// Whether `AUTO_INCREMENT=N` table options are emitted in generated DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAutoInc {
    /// Never emit the clause
    #[default]
    Ignore,
    /// Emit only when the desired value is higher than the live one
    IfIncreased,
    /// Always emit when the values differ
    Always,
}

/// How partitioning clauses are handled when diffing tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitioningMode {
    /// Diff partitioning like any other table attribute
    #[default]
    Keep,
    /// Desired-state partitioning was stripped before diffing; live
    /// partitioning is removed
    Remove,
    /// Ignore partitioning differences entirely
    Permissive,
}

impl FromStr for PartitioningMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(PartitioningMode::Keep),
            "remove" => Ok(PartitioningMode::Remove),
            "permissive" => Ok(PartitioningMode::Permissive),
            other => Err(Error::Config(format!("invalid partitioning mode '{other}'"))),
        }
    }
}

/// `ALGORITHM=` clause appended to generated ALTERs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmClause {
    /// No clause
    #[default]
    Unset,
    Inplace,
    Copy,
    Instant,
    Nocopy,
    Default,
}

impl AlgorithmClause {
    pub fn as_sql(&self) -> Option<&'static str> {
        match self {
            AlgorithmClause::Unset => None,
            AlgorithmClause::Inplace => Some("INPLACE"),
            AlgorithmClause::Copy => Some("COPY"),
            AlgorithmClause::Instant => Some("INSTANT"),
            AlgorithmClause::Nocopy => Some("NOCOPY"),
            AlgorithmClause::Default => Some("DEFAULT"),
        }
    }
}

impl FromStr for AlgorithmClause {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(AlgorithmClause::Unset),
            "inplace" => Ok(AlgorithmClause::Inplace),
            "copy" => Ok(AlgorithmClause::Copy),
            "instant" => Ok(AlgorithmClause::Instant),
            "nocopy" => Ok(AlgorithmClause::Nocopy),
            "default" => Ok(AlgorithmClause::Default),
            other => Err(Error::Config(format!("invalid alter-algorithm '{other}'"))),
        }
    }
}

/// `LOCK=` clause appended to generated ALTERs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockClause {
    /// No clause
    #[default]
    Unset,
    None,
    Shared,
    Exclusive,
    Default,
}

impl LockClause {
    pub fn as_sql(&self) -> Option<&'static str> {
        match self {
            LockClause::Unset => None,
            LockClause::None => Some("NONE"),
            LockClause::Shared => Some("SHARED"),
            LockClause::Exclusive => Some("EXCLUSIVE"),
            LockClause::Default => Some("DEFAULT"),
        }
    }
}

impl FromStr for LockClause {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(LockClause::Unset),
            "none" => Ok(LockClause::None),
            "shared" => Ok(LockClause::Shared),
            "exclusive" => Ok(LockClause::Exclusive),
            "default" => Ok(LockClause::Default),
            other => Err(Error::Config(format!("invalid alter-lock '{other}'"))),
        }
    }
}

/// Knobs controlling how an object diff is rendered to SQL.
#[derive(Debug, Clone, Default)]
pub struct StatementModifiers {
    /// Permit data-destructive clauses
    pub allow_unsafe: bool,
    pub next_auto_inc: NextAutoInc,
    pub partitioning: PartitioningMode,
    pub algorithm_clause: AlgorithmClause,
    pub lock_clause: LockClause,
    /// Re-create secondary indexes whose relative order changed
    pub strict_index_order: bool,
    /// Match check constraints by name, not just clause text
    pub strict_check_constraints: bool,
    /// Re-create foreign keys whose name differs even when structurally
    /// identical
    pub strict_foreign_key_naming: bool,
    /// Compare column-level charset/collation clauses even when redundant
    /// with the table default
    pub strict_column_definition: bool,
    /// Ignore column order differences
    pub lax_column_order: bool,
    /// Ignore comment differences on tables and columns
    pub lax_comments: bool,
    /// Diff creation-time metadata of routines (sql_mode, definer)
    pub compare_metadata: bool,
    /// Include `WITH VALIDATION` when altering virtual columns
    pub virtual_col_validation: bool,
    /// Suppress the early ALTERs that drop modified foreign keys before
    /// the main ALTER runs
    pub skip_pre_drop_alters: bool,
    /// Target server flavor, when known
    pub flavor: Option<Flavor>,
}

impl StatementModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// The modifier set used when replaying ALTERs for verification:
    /// everything strict, so the replayed table must match exactly.
    pub fn strict_for_verification(flavor: Flavor) -> Self {
        let mut mods = Self {
            allow_unsafe: true,
            next_auto_inc: NextAutoInc::Always,
            partitioning: PartitioningMode::Permissive,
            algorithm_clause: AlgorithmClause::Copy,
            strict_index_order: true,
            strict_check_constraints: true,
            strict_foreign_key_naming: true,
            strict_column_definition: true,
            skip_pre_drop_alters: true,
            flavor: Some(flavor),
            ..Self::default()
        };
        // ALGORITHM clauses only parse on 5.6+.
        if !flavor.supports_algorithm_clause() {
            mods.algorithm_clause = AlgorithmClause::Unset;
        }
        mods
    }

    /// The modifier set used when re-diffing a verified table against the
    /// desired state. Column-level charset clauses are relaxed since some
    /// servers add cosmetic but inconsequential ones during ALTER, and
    /// auto-increment counters are excused because the server may clamp
    /// them.
    pub fn strict_for_reverification(flavor: Flavor) -> Self {
        Self {
            strict_column_definition: false,
            algorithm_clause: AlgorithmClause::Unset,
            next_auto_inc: NextAutoInc::Ignore,
            ..Self::strict_for_verification(flavor)
        }
    }
}

#[cfg(test)]
mod tests;
