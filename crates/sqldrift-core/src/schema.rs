//! Schema object model: tables, routines, and their parts

use std::fmt;

use serde::{Deserialize, Serialize};

/// Quote an identifier with backticks, escaping embedded backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Escape a string for inclusion in a single-quoted SQL literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

/// Kind of schema object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Table,
    Procedure,
    Function,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Table => "table",
            ObjectType::Procedure => "procedure",
            ObjectType::Function => "function",
        }
    }

    /// SQL keyword for CREATE/DROP statements
    pub fn keyword(&self) -> &'static str {
        match self {
            ObjectType::Table => "TABLE",
            ObjectType::Procedure => "PROCEDURE",
            ObjectType::Function => "FUNCTION",
        }
    }

    /// True for stored programs, whose bodies may contain inner `;`
    /// terminators and therefore need a non-default client delimiter.
    pub fn is_stored_program(&self) -> bool {
        matches!(self, ObjectType::Procedure | ObjectType::Function)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a schema object within one schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub object_type: ObjectType,
    pub name: String,
}

impl ObjectKey {
    pub fn new(object_type: ObjectType, name: impl Into<String>) -> Self {
        Self {
            object_type,
            name: name.into(),
        }
    }

    pub fn table(name: impl Into<String>) -> Self {
        Self::new(ObjectType::Table, name)
    }

    /// Copy of this key with the name lowercased, for servers running
    /// with case-insensitive name handling.
    pub fn lowercased(&self) -> Self {
        Self {
            object_type: self.object_type,
            name: self.name.to_lowercase(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.object_type, quote_ident(&self.name))
    }
}

/// A column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Full type definition, e.g. `varchar(40)` or `int unsigned`
    pub type_definition: String,
    pub nullable: bool,
    /// Default expression as the server reports it; `None` means no
    /// DEFAULT clause. An explicit `DEFAULT NULL` is `Some("NULL")`.
    pub default: Option<String>,
    pub auto_increment: bool,
    pub charset: Option<String>,
    pub collation: Option<String>,
    /// Expression for generated columns
    pub generation_expression: Option<String>,
    /// `ON UPDATE` expression for timestamp columns
    pub on_update: Option<String>,
    pub comment: Option<String>,
}

impl Column {
    /// Render the column definition as used in CREATE/ALTER clauses.
    pub fn definition(&self) -> String {
        let mut out = format!("{} {}", quote_ident(&self.name), self.type_definition);
        if let Some(charset) = &self.charset {
            out.push_str(&format!(" CHARACTER SET {charset}"));
            if let Some(collation) = &self.collation {
                out.push_str(&format!(" COLLATE {collation}"));
            }
        }
        if let Some(expr) = &self.generation_expression {
            out.push_str(&format!(" GENERATED ALWAYS AS ({expr}) VIRTUAL"));
        }
        if !self.nullable {
            out.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            out.push_str(&format!(" DEFAULT {default}"));
        }
        if let Some(on_update) = &self.on_update {
            out.push_str(&format!(" ON UPDATE {on_update}"));
        }
        if self.auto_increment {
            out.push_str(" AUTO_INCREMENT");
        }
        if let Some(comment) = &self.comment {
            out.push_str(&format!(" COMMENT '{}'", escape_literal(comment)));
        }
        out
    }

    /// Definition with comment clauses stripped, for lax-comment diffing.
    pub fn definition_without_comment(&self) -> String {
        let mut copy = self.clone();
        copy.comment = None;
        copy.definition()
    }
}

/// One column reference inside an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPart {
    pub column: String,
    /// Prefix length for partial indexes on string columns
    pub sub_part: Option<u32>,
}

impl IndexPart {
    pub fn definition(&self) -> String {
        match self.sub_part {
            Some(len) => format!("{}({len})", quote_ident(&self.column)),
            None => quote_ident(&self.column),
        }
    }
}

/// An index or primary key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub parts: Vec<IndexPart>,
    pub unique: bool,
    /// `BTREE`, `HASH`, `FULLTEXT`, ...
    pub index_type: String,
    pub comment: Option<String>,
}

impl Index {
    pub fn is_primary(&self) -> bool {
        self.name == "PRIMARY"
    }

    /// Column list as it appears between parentheses
    pub fn parts_definition(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.definition())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render the index clause as used in CREATE/ALTER statements.
    pub fn definition(&self) -> String {
        if self.is_primary() {
            format!("PRIMARY KEY ({})", self.parts_definition())
        } else if self.unique {
            format!(
                "UNIQUE KEY {} ({})",
                quote_ident(&self.name),
                self.parts_definition()
            )
        } else if self.index_type == "FULLTEXT" {
            format!(
                "FULLTEXT KEY {} ({})",
                quote_ident(&self.name),
                self.parts_definition()
            )
        } else {
            format!(
                "KEY {} ({})",
                quote_ident(&self.name),
                self.parts_definition()
            )
        }
    }

    /// Structural identity ignoring the index name, used to match renamed
    /// but otherwise identical indexes.
    pub fn signature(&self) -> String {
        format!(
            "{}|{}|{}",
            self.unique,
            self.index_type,
            self.parts_definition()
        )
    }
}

/// A foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_schema: Option<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    /// `RESTRICT`, `CASCADE`, `SET NULL`, `NO ACTION`
    pub update_rule: String,
    pub delete_rule: String,
}

impl ForeignKey {
    /// Render the constraint clause as used in CREATE/ALTER statements.
    pub fn definition(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let ref_columns = self
            .referenced_columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let ref_table = match &self.referenced_schema {
            Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&self.referenced_table)),
            None => quote_ident(&self.referenced_table),
        };
        let mut out = format!(
            "CONSTRAINT {} FOREIGN KEY ({columns}) REFERENCES {ref_table} ({ref_columns})",
            quote_ident(&self.name)
        );
        if self.delete_rule != "NO ACTION" && self.delete_rule != "RESTRICT" {
            out.push_str(&format!(" ON DELETE {}", self.delete_rule));
        }
        if self.update_rule != "NO ACTION" && self.update_rule != "RESTRICT" {
            out.push_str(&format!(" ON UPDATE {}", self.update_rule));
        }
        out
    }

    /// Structural identity ignoring the constraint name.
    pub fn signature(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.columns.join(","),
            self.referenced_table,
            self.referenced_columns.join(","),
            self.update_rule,
            self.delete_rule
        )
    }
}

/// A CHECK constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraint {
    pub name: String,
    /// Check expression, without the outer parentheses
    pub clause: String,
    pub enforced: bool,
}

impl CheckConstraint {
    /// Render the constraint clause as used in CREATE/ALTER statements.
    pub fn definition(&self) -> String {
        let mut out = format!("CONSTRAINT {} CHECK ({})", quote_ident(&self.name), self.clause);
        if !self.enforced {
            out.push_str(" NOT ENFORCED");
        }
        out
    }
}

/// A base table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub checks: Vec<CheckConstraint>,
    pub engine: String,
    pub charset: String,
    pub collation: String,
    pub row_format: Option<String>,
    /// Full partitioning clause (`PARTITION BY ...`), when partitioned
    pub partitioning: Option<String>,
    pub next_auto_increment: Option<u64>,
    pub comment: Option<String>,
    /// `SHOW CREATE TABLE` output as reported by the server
    pub create_statement: String,
}

impl Table {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::table(&self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.name == name)
    }

    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.is_primary())
    }

    /// Secondary (non-primary) indexes in definition order
    pub fn secondary_indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.iter().filter(|i| !i.is_primary())
    }

    pub fn has_auto_increment(&self) -> bool {
        self.columns.iter().any(|c| c.auto_increment)
    }

    /// Create statement with any AUTO_INCREMENT=N clause removed, for
    /// comparisons that must ignore insertion progress.
    pub fn create_statement_without_auto_inc(&self) -> String {
        strip_auto_inc_clause(&self.create_statement)
    }
}

/// Strip ` AUTO_INCREMENT=N` table options from a CREATE statement.
pub fn strip_auto_inc_clause(create: &str) -> String {
    match create.find(" AUTO_INCREMENT=") {
        Some(start) => {
            let rest = &create[start + 1..];
            let end = rest
                .find(' ')
                .map(|e| start + 1 + e + 1)
                .unwrap_or(create.len());
            let mut out = String::with_capacity(create.len());
            out.push_str(&create[..start]);
            if end < create.len() {
                out.push(' ');
                out.push_str(&create[end..]);
            }
            out
        }
        None => create.to_string(),
    }
}

/// A stored procedure or function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,
    pub object_type: ObjectType,
    /// `user@host` as reported by the server
    pub definer: String,
    /// Parameter list between the parentheses of the CREATE statement
    pub param_list: String,
    /// Return type, for functions only
    pub returns: Option<String>,
    pub body: String,
    pub sql_mode: String,
    pub security_type: String,
    pub comment: Option<String>,
    /// `SHOW CREATE` output as reported by the server
    pub create_statement: String,
}

impl Routine {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.object_type, &self.name)
    }

    /// Equality of the parts that matter for diffing: everything except
    /// the definer, which is compared only when requested.
    pub fn equals_ignoring_definer(&self, other: &Routine) -> bool {
        self.param_list == other.param_list
            && self.returns == other.returns
            && self.body == other.body
            && self.sql_mode == other.sql_mode
            && self.security_type == other.security_type
            && self.comment == other.comment
    }
}

/// A named collection of schema objects on one server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub charset: String,
    pub collation: String,
    pub tables: Vec<Table>,
    pub routines: Vec<Routine>,
}

impl Schema {
    pub fn object_count(&self) -> usize {
        self.tables.len() + self.routines.len()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn routine(&self, object_type: ObjectType, name: &str) -> Option<&Routine> {
        self.routines
            .iter()
            .find(|r| r.object_type == object_type && r.name == name)
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        match key.object_type {
            ObjectType::Table => self.table(&key.name).is_some(),
            _ => self.routine(key.object_type, &key.name).is_some(),
        }
    }

    /// All object keys, tables first, in definition order.
    pub fn object_keys(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<ObjectKey> = self.tables.iter().map(|t| t.key()).collect();
        keys.extend(self.routines.iter().map(|r| r.key()));
        keys
    }
}

#[cfg(test)]
mod tests;
