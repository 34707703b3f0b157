//! Object-level schema diffing

use std::fmt;

use thiserror::Error;

use sqldrift_core::{ObjectKey, ObjectType, Routine, Schema, Table, quote_ident};

use crate::modifiers::StatementModifiers;
use crate::routine;
use crate::table;

/// Kind of change an object diff represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    Create,
    Alter,
    Drop,
}

impl fmt::Display for DiffType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiffType::Create => "CREATE",
            DiffType::Alter => "ALTER",
            DiffType::Drop => "DROP",
        })
    }
}

/// Refinement of an object diff beyond its basic type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffSubtype {
    #[default]
    Standard,
    /// An early ALTER dropping modified foreign keys, emitted before the
    /// main ALTER of the same table
    FkPreDrop,
    /// Half of a routine drop/create pair whose only differences are
    /// creation-time metadata; rendered only under compare-metadata
    RoutineMetadata,
}

/// One object in a diff: an owned table or routine definition.
#[derive(Debug, Clone)]
pub enum SchemaObject {
    Table(Table),
    Routine(Routine),
}

impl SchemaObject {
    pub fn key(&self) -> ObjectKey {
        match self {
            SchemaObject::Table(table) => table.key(),
            SchemaObject::Routine(routine) => routine.key(),
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            SchemaObject::Table(table) => Some(table),
            SchemaObject::Routine(_) => None,
        }
    }

    pub fn as_routine(&self) -> Option<&Routine> {
        match self {
            SchemaObject::Routine(routine) => Some(routine),
            SchemaObject::Table(_) => None,
        }
    }
}

/// Error produced when rendering an object diff to SQL.
///
/// Both the unsafe and unsupported variants still carry the generated SQL
/// so callers can display what was blocked or replay it for verification.
#[derive(Debug, Error)]
pub enum StatementError {
    #[error("unsafe statement: {reason}")]
    Unsafe { sql: String, reason: String },

    #[error("unsupported diff: {reason}")]
    Unsupported { sql: String, reason: String },

    #[error("{0}")]
    Fatal(String),
}

impl StatementError {
    /// The best-effort SQL behind this error, when any was generated.
    pub fn sql(&self) -> Option<&str> {
        match self {
            StatementError::Unsafe { sql, .. } | StatementError::Unsupported { sql, .. } => {
                (!sql.is_empty()).then_some(sql.as_str())
            }
            StatementError::Fatal(_) => None,
        }
    }
}

/// One object-level difference between two schemas.
#[derive(Debug, Clone)]
pub struct ObjectDiff {
    pub diff_type: DiffType,
    pub key: ObjectKey,
    pub subtype: DiffSubtype,
    pub from: Option<SchemaObject>,
    pub to: Option<SchemaObject>,
}

impl ObjectDiff {
    /// Render this diff to SQL under the given modifiers.
    ///
    /// An empty string means the diff is a no-op under these modifiers
    /// (for example a metadata-only routine change without
    /// compare-metadata). Unsafe and unsupported diffs return errors that
    /// still carry the generated SQL.
    pub fn statement(&self, mods: &StatementModifiers) -> Result<String, StatementError> {
        match (self.diff_type, self.subtype) {
            (DiffType::Alter, DiffSubtype::FkPreDrop) => {
                if mods.skip_pre_drop_alters {
                    return Ok(String::new());
                }
                let (from, to) = self.table_pair()?;
                Ok(table::generate_fk_pre_drop(from, to))
            }
            (DiffType::Create, _) => match self.to_object()? {
                SchemaObject::Table(to_table) => Ok(table::generate_create(to_table, mods)),
                SchemaObject::Routine(to_routine) => {
                    if self.subtype == DiffSubtype::RoutineMetadata && !mods.compare_metadata {
                        return Ok(String::new());
                    }
                    Ok(routine::generate_create(to_routine))
                }
            },
            (DiffType::Drop, _) => match self.from_object()? {
                SchemaObject::Table(from_table) => {
                    let sql = format!("DROP TABLE {}", quote_ident(&from_table.name));
                    if mods.allow_unsafe {
                        Ok(sql)
                    } else {
                        Err(StatementError::Unsafe {
                            sql,
                            reason: format!(
                                "dropping table {} destroys its data",
                                quote_ident(&from_table.name)
                            ),
                        })
                    }
                }
                SchemaObject::Routine(from_routine) => {
                    if self.subtype == DiffSubtype::RoutineMetadata && !mods.compare_metadata {
                        return Ok(String::new());
                    }
                    Ok(routine::generate_drop(from_routine))
                }
            },
            (DiffType::Alter, DiffSubtype::Standard | DiffSubtype::RoutineMetadata) => {
                let (from, to) = self.table_pair()?;
                table::generate_alter(from, to, mods).into_result(mods)
            }
        }
    }

    fn from_object(&self) -> Result<&SchemaObject, StatementError> {
        self.from.as_ref().ok_or_else(|| {
            StatementError::Fatal(format!("{} diff for {} has no source object", self.diff_type, self.key))
        })
    }

    fn to_object(&self) -> Result<&SchemaObject, StatementError> {
        self.to.as_ref().ok_or_else(|| {
            StatementError::Fatal(format!("{} diff for {} has no target object", self.diff_type, self.key))
        })
    }

    fn table_pair(&self) -> Result<(&Table, &Table), StatementError> {
        let from = self.from_object()?.as_table();
        let to = self.to_object()?.as_table();
        match (from, to) {
            (Some(from), Some(to)) => Ok((from, to)),
            _ => Err(StatementError::Fatal(format!(
                "ALTER diff for {} does not reference tables on both sides",
                self.key
            ))),
        }
    }
}

/// Ordered list of object diffs between two schemas.
#[derive(Debug, Clone, Default)]
pub struct SchemaDiff {
    pub from_schema: String,
    pub to_schema: String,
    diffs: Vec<ObjectDiff>,
}

impl SchemaDiff {
    pub fn object_diffs(&self) -> &[ObjectDiff] {
        &self.diffs
    }

    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    /// Alters of tables, the inputs to diff verification.
    pub fn table_alters(&self) -> impl Iterator<Item = &ObjectDiff> {
        self.diffs.iter().filter(|d| {
            d.diff_type == DiffType::Alter
                && d.key.object_type == ObjectType::Table
                && d.subtype != DiffSubtype::FkPreDrop
        })
    }
}

/// Compute the object-level diff reconciling `from` (live state) to `to`
/// (desired state).
///
/// Emission order: table creates, foreign-key pre-drops, table alters,
/// routine changes (drop before create per object key), then drops.
pub fn diff_schemas(from: &Schema, to: &Schema) -> SchemaDiff {
    let mut diffs: Vec<ObjectDiff> = Vec::new();

    let mut sorted_to_tables: Vec<&Table> = to.tables.iter().collect();
    sorted_to_tables.sort_by(|a, b| a.name.cmp(&b.name));
    let mut sorted_from_tables: Vec<&Table> = from.tables.iter().collect();
    sorted_from_tables.sort_by(|a, b| a.name.cmp(&b.name));

    for to_table in &sorted_to_tables {
        if from.table(&to_table.name).is_none() {
            diffs.push(ObjectDiff {
                diff_type: DiffType::Create,
                key: to_table.key(),
                subtype: DiffSubtype::Standard,
                from: None,
                to: Some(SchemaObject::Table((*to_table).clone())),
            });
        }
    }

    for to_table in &sorted_to_tables {
        let Some(from_table) = from.table(&to_table.name) else {
            continue;
        };
        if table::tables_equal(from_table, to_table) {
            continue;
        }
        if !table::modified_foreign_key_names(from_table, to_table).is_empty() {
            diffs.push(ObjectDiff {
                diff_type: DiffType::Alter,
                key: to_table.key(),
                subtype: DiffSubtype::FkPreDrop,
                from: Some(SchemaObject::Table(from_table.clone())),
                to: Some(SchemaObject::Table((*to_table).clone())),
            });
        }
        diffs.push(ObjectDiff {
            diff_type: DiffType::Alter,
            key: to_table.key(),
            subtype: DiffSubtype::Standard,
            from: Some(SchemaObject::Table(from_table.clone())),
            to: Some(SchemaObject::Table((*to_table).clone())),
        });
    }

    let mut sorted_to_routines: Vec<&Routine> = to.routines.iter().collect();
    sorted_to_routines.sort_by(|a, b| (a.object_type, &a.name).cmp(&(b.object_type, &b.name)));

    for to_routine in &sorted_to_routines {
        match from.routine(to_routine.object_type, &to_routine.name) {
            None => diffs.push(ObjectDiff {
                diff_type: DiffType::Create,
                key: to_routine.key(),
                subtype: DiffSubtype::Standard,
                from: None,
                to: Some(SchemaObject::Routine((*to_routine).clone())),
            }),
            Some(from_routine) if routine::routines_differ(from_routine, to_routine) => {
                let subtype = if routine::metadata_only_change(from_routine, to_routine) {
                    DiffSubtype::RoutineMetadata
                } else {
                    DiffSubtype::Standard
                };
                diffs.push(ObjectDiff {
                    diff_type: DiffType::Drop,
                    key: to_routine.key(),
                    subtype,
                    from: Some(SchemaObject::Routine(from_routine.clone())),
                    to: Some(SchemaObject::Routine((*to_routine).clone())),
                });
                diffs.push(ObjectDiff {
                    diff_type: DiffType::Create,
                    key: to_routine.key(),
                    subtype,
                    from: Some(SchemaObject::Routine(from_routine.clone())),
                    to: Some(SchemaObject::Routine((*to_routine).clone())),
                });
            }
            Some(_) => {}
        }
    }

    let mut sorted_from_routines: Vec<&Routine> = from.routines.iter().collect();
    sorted_from_routines.sort_by(|a, b| (a.object_type, &a.name).cmp(&(b.object_type, &b.name)));
    for from_routine in &sorted_from_routines {
        if to.routine(from_routine.object_type, &from_routine.name).is_none() {
            diffs.push(ObjectDiff {
                diff_type: DiffType::Drop,
                key: from_routine.key(),
                subtype: DiffSubtype::Standard,
                from: Some(SchemaObject::Routine((*from_routine).clone())),
                to: None,
            });
        }
    }

    for from_table in &sorted_from_tables {
        if to.table(&from_table.name).is_none() {
            diffs.push(ObjectDiff {
                diff_type: DiffType::Drop,
                key: from_table.key(),
                subtype: DiffSubtype::Standard,
                from: Some(SchemaObject::Table((*from_table).clone())),
                to: None,
            });
        }
    }

    tracing::debug!(
        from = %from.name,
        to = %to.name,
        diff_count = diffs.len(),
        "computed schema diff"
    );

    SchemaDiff {
        from_schema: from.name.clone(),
        to_schema: to.name.clone(),
        diffs,
    }
}

#[cfg(test)]
mod tests;
