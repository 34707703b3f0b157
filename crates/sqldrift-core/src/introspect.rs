//! Live-schema introspection over information_schema

use std::collections::HashMap;

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Pool, Row};

use crate::error::Result;
use crate::flavor::Flavor;
use crate::schema::{
    CheckConstraint, Column, ForeignKey, Index, IndexPart, ObjectType, Routine, Schema, Table,
    quote_ident,
};

/// Introspect one named schema. Returns `Ok(None)` when the schema does
/// not exist on the server.
#[tracing::instrument(skip(pool, flavor), fields(schema = %schema_name))]
pub async fn introspect_schema(
    pool: &Pool,
    schema_name: &str,
    flavor: &Flavor,
) -> Result<Option<Schema>> {
    let mut conn = pool.get_conn().await?;

    let schemata: Option<(String, String)> = conn
        .exec_first(
            "SELECT DEFAULT_CHARACTER_SET_NAME, DEFAULT_COLLATION_NAME \
             FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = ?",
            (schema_name,),
        )
        .await?;
    let Some((charset, collation)) = schemata else {
        return Ok(None);
    };

    let mut tables = query_tables(&mut conn, schema_name).await?;
    let columns = query_columns(&mut conn, schema_name, flavor).await?;
    let indexes = query_indexes(&mut conn, schema_name).await?;
    let foreign_keys = query_foreign_keys(&mut conn, schema_name).await?;
    let checks = query_check_constraints(&mut conn, schema_name, flavor).await?;

    for table in &mut tables {
        if let Some(cols) = columns.get(&table.name) {
            table.columns = cols.clone();
        }
        if let Some(idx) = indexes.get(&table.name) {
            table.indexes = idx.clone();
        }
        if let Some(fks) = foreign_keys.get(&table.name) {
            table.foreign_keys = fks.clone();
        }
        if let Some(cks) = checks.get(&table.name) {
            table.checks = cks.clone();
        }
        let create = show_create_table(&mut conn, schema_name, &table.name).await?;
        table.partitioning = extract_partitioning(&create);
        table.create_statement = create;
    }

    let routines = query_routines(&mut conn, schema_name).await?;

    tracing::debug!(
        tables = tables.len(),
        routines = routines.len(),
        "introspected schema"
    );

    Ok(Some(Schema {
        name: schema_name.to_string(),
        charset,
        collation,
        tables,
        routines,
    }))
}

/// The session's effective `sql_mode`.
pub async fn session_sql_mode(pool: &Pool) -> Result<String> {
    let mut conn = pool.get_conn().await?;
    let mode: Option<String> = conn.query_first("SELECT @@session.sql_mode").await?;
    Ok(mode.unwrap_or_default())
}

async fn query_tables(conn: &mut Conn, schema_name: &str) -> Result<Vec<Table>> {
    type TableRow = (
        String,
        Option<String>,
        Option<String>,
        Option<u64>,
        Option<String>,
        Option<String>,
        Option<String>,
    );
    let rows: Vec<TableRow> = conn
        .exec(
            "SELECT t.TABLE_NAME, t.ENGINE, t.ROW_FORMAT, t.AUTO_INCREMENT, \
                    t.TABLE_COLLATION, ccsa.CHARACTER_SET_NAME, t.TABLE_COMMENT \
             FROM information_schema.TABLES t \
             LEFT JOIN information_schema.COLLATION_CHARACTER_SET_APPLICABILITY ccsa \
                    ON t.TABLE_COLLATION = ccsa.COLLATION_NAME \
             WHERE t.TABLE_SCHEMA = ? AND t.TABLE_TYPE = 'BASE TABLE' \
             ORDER BY t.TABLE_NAME",
            (schema_name,),
        )
        .await?;

    Ok(rows
        .into_iter()
        .map(
            |(name, engine, row_format, auto_inc, collation, charset, comment)| Table {
                name,
                columns: Vec::new(),
                indexes: Vec::new(),
                foreign_keys: Vec::new(),
                checks: Vec::new(),
                engine: engine.unwrap_or_default(),
                charset: charset.unwrap_or_default(),
                collation: collation.unwrap_or_default(),
                row_format,
                partitioning: None,
                next_auto_increment: auto_inc,
                comment: comment.filter(|c| !c.is_empty()),
                create_statement: String::new(),
            },
        )
        .collect())
}

async fn query_columns(
    conn: &mut Conn,
    schema_name: &str,
    flavor: &Flavor,
) -> Result<HashMap<String, Vec<Column>>> {
    // GENERATION_EXPRESSION only exists on servers with generated-column
    // support; select NULL on older ones so the row shape stays fixed.
    let generation_expr = if flavor.min_mysql(5, 7) || flavor.min_mariadb(10, 2) {
        "NULLIF(GENERATION_EXPRESSION, '')"
    } else {
        "NULL"
    };
    let sql = format!(
        "SELECT TABLE_NAME, COLUMN_NAME, COLUMN_TYPE, IS_NULLABLE, COLUMN_DEFAULT, \
                EXTRA, CHARACTER_SET_NAME, COLLATION_NAME, {generation_expr}, COLUMN_COMMENT \
         FROM information_schema.COLUMNS WHERE TABLE_SCHEMA = ? \
         ORDER BY TABLE_NAME, ORDINAL_POSITION"
    );

    type ColumnRow = (
        String,
        String,
        String,
        String,
        Option<String>,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
    );
    let rows: Vec<ColumnRow> = conn.exec(sql, (schema_name,)).await?;

    let mut by_table: HashMap<String, Vec<Column>> = HashMap::new();
    for (
        table,
        name,
        column_type,
        is_nullable,
        raw_default,
        extra,
        charset,
        collation,
        generation_expression,
        comment,
    ) in rows
    {
        let nullable = is_nullable == "YES";
        let auto_increment = extra.to_lowercase().contains("auto_increment");
        let on_update = extract_on_update(&extra);
        let default = normalize_default(&column_type, nullable, raw_default, &extra);
        by_table.entry(table).or_default().push(Column {
            name,
            type_definition: column_type,
            nullable,
            default,
            auto_increment,
            charset,
            collation,
            generation_expression,
            on_update,
            comment: comment.filter(|c| !c.is_empty()),
        });
    }
    Ok(by_table)
}

/// Render a column default the way SHOW CREATE TABLE does: string-ish
/// values quoted, numeric and expression defaults left bare, and implicit
/// NULL defaults made explicit for nullable columns.
fn normalize_default(
    column_type: &str,
    nullable: bool,
    raw: Option<String>,
    extra: &str,
) -> Option<String> {
    const BARE_TYPE_PREFIXES: &[&str] = &[
        "tinyint", "smallint", "mediumint", "int", "bigint", "decimal", "float", "double", "bit",
        "year", "boolean",
    ];

    let Some(raw) = raw else {
        return nullable.then(|| "NULL".to_string());
    };
    if raw.eq_ignore_ascii_case("null") {
        return Some("NULL".to_string());
    }
    if extra.to_uppercase().contains("DEFAULT_GENERATED")
        || raw.to_uppercase().starts_with("CURRENT_TIMESTAMP")
    {
        return Some(raw);
    }
    let lower_type = column_type.to_lowercase();
    if BARE_TYPE_PREFIXES.iter().any(|p| lower_type.starts_with(p)) {
        return Some(raw);
    }
    Some(format!("'{}'", raw.replace('\'', "''")))
}

fn extract_on_update(extra: &str) -> Option<String> {
    let lower = extra.to_lowercase();
    let pos = lower.find("on update ")?;
    Some(extra[pos + "on update ".len()..].trim().to_string())
}

async fn query_indexes(
    conn: &mut Conn,
    schema_name: &str,
) -> Result<HashMap<String, Vec<Index>>> {
    type IndexRow = (
        String,
        String,
        i64,
        u32,
        Option<String>,
        Option<u64>,
        String,
        Option<String>,
    );
    let rows: Vec<IndexRow> = conn
        .exec(
            "SELECT TABLE_NAME, INDEX_NAME, NON_UNIQUE, SEQ_IN_INDEX, COLUMN_NAME, \
                    SUB_PART, INDEX_TYPE, INDEX_COMMENT \
             FROM information_schema.STATISTICS WHERE TABLE_SCHEMA = ? \
             ORDER BY TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX",
            (schema_name,),
        )
        .await?;

    let mut by_table: HashMap<String, Vec<Index>> = HashMap::new();
    for (table, index_name, non_unique, _seq, column, sub_part, index_type, comment) in rows {
        let Some(column) = column else {
            continue;
        };
        let indexes = by_table.entry(table).or_default();
        let part = IndexPart {
            column,
            sub_part: sub_part.map(|s| s as u32),
        };
        match indexes.iter_mut().find(|i| i.name == index_name) {
            Some(index) => index.parts.push(part),
            None => indexes.push(Index {
                name: index_name,
                parts: vec![part],
                unique: non_unique == 0,
                index_type,
                comment: comment.filter(|c| !c.is_empty()),
            }),
        }
    }

    // Primary key first, matching SHOW CREATE TABLE ordering.
    for indexes in by_table.values_mut() {
        indexes.sort_by_key(|i| !i.is_primary());
    }
    Ok(by_table)
}

async fn query_foreign_keys(
    conn: &mut Conn,
    schema_name: &str,
) -> Result<HashMap<String, Vec<ForeignKey>>> {
    type FkRow = (
        String,
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        String,
        String,
    );
    let rows: Vec<FkRow> = conn
        .exec(
            "SELECT kcu.TABLE_NAME, kcu.CONSTRAINT_NAME, kcu.COLUMN_NAME, \
                    kcu.REFERENCED_TABLE_SCHEMA, kcu.REFERENCED_TABLE_NAME, \
                    kcu.REFERENCED_COLUMN_NAME, rc.UPDATE_RULE, rc.DELETE_RULE \
             FROM information_schema.KEY_COLUMN_USAGE kcu \
             JOIN information_schema.REFERENTIAL_CONSTRAINTS rc \
                   ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA \
                  AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME \
                  AND rc.TABLE_NAME = kcu.TABLE_NAME \
             WHERE kcu.TABLE_SCHEMA = ? AND kcu.REFERENCED_TABLE_NAME IS NOT NULL \
             ORDER BY kcu.TABLE_NAME, kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION",
            (schema_name,),
        )
        .await?;

    let mut by_table: HashMap<String, Vec<ForeignKey>> = HashMap::new();
    for (table, name, column, ref_schema, ref_table, ref_column, update_rule, delete_rule) in rows {
        let (Some(ref_table), Some(ref_column)) = (ref_table, ref_column) else {
            continue;
        };
        let fks = by_table.entry(table).or_default();
        match fks.iter_mut().find(|fk| fk.name == name) {
            Some(fk) => {
                fk.columns.push(column);
                fk.referenced_columns.push(ref_column);
            }
            None => fks.push(ForeignKey {
                name,
                columns: vec![column],
                referenced_schema: ref_schema.filter(|s| s != schema_name),
                referenced_table: ref_table,
                referenced_columns: vec![ref_column],
                update_rule,
                delete_rule,
            }),
        }
    }
    Ok(by_table)
}

async fn query_check_constraints(
    conn: &mut Conn,
    schema_name: &str,
    flavor: &Flavor,
) -> Result<HashMap<String, Vec<CheckConstraint>>> {
    // CHECK constraints exist on MySQL 8.0.16+ and MariaDB 10.2+. Older
    // servers parse but discard them, so there is nothing to read.
    if !(flavor.min_mysql(8, 0) || flavor.min_mariadb(10, 2)) {
        return Ok(HashMap::new());
    }

    type CheckRow = (String, String, String, Option<String>);
    let rows: Vec<CheckRow> = conn
        .exec(
            "SELECT tc.TABLE_NAME, cc.CONSTRAINT_NAME, cc.CHECK_CLAUSE, tc.ENFORCED \
             FROM information_schema.CHECK_CONSTRAINTS cc \
             JOIN information_schema.TABLE_CONSTRAINTS tc \
                   ON tc.CONSTRAINT_SCHEMA = cc.CONSTRAINT_SCHEMA \
                  AND tc.CONSTRAINT_NAME = cc.CONSTRAINT_NAME \
             WHERE cc.CONSTRAINT_SCHEMA = ? AND tc.CONSTRAINT_TYPE = 'CHECK' \
             ORDER BY tc.TABLE_NAME, cc.CONSTRAINT_NAME",
            (schema_name,),
        )
        .await?;

    let mut by_table: HashMap<String, Vec<CheckConstraint>> = HashMap::new();
    for (table, name, clause, enforced) in rows {
        let clause = clause
            .strip_prefix('(')
            .and_then(|c| c.strip_suffix(')'))
            .unwrap_or(&clause)
            .to_string();
        by_table.entry(table).or_default().push(CheckConstraint {
            name,
            clause,
            enforced: enforced.as_deref() != Some("NO"),
        });
    }
    Ok(by_table)
}

async fn show_create_table(conn: &mut Conn, schema_name: &str, table: &str) -> Result<String> {
    let row: Option<(String, String)> = conn
        .query_first(format!(
            "SHOW CREATE TABLE {}.{}",
            quote_ident(schema_name),
            quote_ident(table)
        ))
        .await?;
    Ok(row.map(|(_, create)| create).unwrap_or_default())
}

/// Extract the `PARTITION BY ...` clause from a CREATE statement,
/// unwrapping the versioned comment MySQL emits around it.
pub fn extract_partitioning(create: &str) -> Option<String> {
    let pos = create.find("PARTITION BY")?;
    let clause = create[pos..].trim_end();
    let clause = clause.strip_suffix("*/").unwrap_or(clause).trim_end();
    Some(clause.to_string())
}

async fn query_routines(conn: &mut Conn, schema_name: &str) -> Result<Vec<Routine>> {
    type RoutineRow = (
        String,
        String,
        String,
        Option<String>,
        Option<String>,
        String,
        String,
        Option<String>,
    );
    let rows: Vec<RoutineRow> = conn
        .exec(
            "SELECT ROUTINE_NAME, ROUTINE_TYPE, DEFINER, DTD_IDENTIFIER, \
                    ROUTINE_DEFINITION, SQL_MODE, SECURITY_TYPE, ROUTINE_COMMENT \
             FROM information_schema.ROUTINES WHERE ROUTINE_SCHEMA = ? \
             ORDER BY ROUTINE_NAME",
            (schema_name,),
        )
        .await?;

    let param_lists = query_param_lists(conn, schema_name).await?;

    let mut routines = Vec::with_capacity(rows.len());
    for (name, routine_type, definer, returns, body, sql_mode, security_type, comment) in rows {
        let object_type = if routine_type == "FUNCTION" {
            ObjectType::Function
        } else {
            ObjectType::Procedure
        };
        let create_statement =
            show_create_routine(conn, schema_name, &name, object_type).await?;
        routines.push(Routine {
            param_list: param_lists
                .get(&(name.clone(), routine_type))
                .cloned()
                .unwrap_or_default(),
            name,
            object_type,
            definer,
            returns,
            body: body.unwrap_or_default(),
            sql_mode,
            security_type,
            comment: comment.filter(|c| !c.is_empty()),
            create_statement,
        });
    }
    Ok(routines)
}

async fn query_param_lists(
    conn: &mut Conn,
    schema_name: &str,
) -> Result<HashMap<(String, String), String>> {
    type ParamRow = (String, String, u32, Option<String>, Option<String>, String);
    let rows: Vec<ParamRow> = conn
        .exec(
            "SELECT SPECIFIC_NAME, ROUTINE_TYPE, ORDINAL_POSITION, PARAMETER_MODE, \
                    PARAMETER_NAME, DTD_IDENTIFIER \
             FROM information_schema.PARAMETERS WHERE SPECIFIC_SCHEMA = ? \
             ORDER BY SPECIFIC_NAME, ORDINAL_POSITION",
            (schema_name,),
        )
        .await?;

    let mut by_routine: HashMap<(String, String), Vec<String>> = HashMap::new();
    for (name, routine_type, ordinal, mode, param_name, data_type) in rows {
        // Ordinal 0 is a function's return value, not a parameter.
        if ordinal == 0 {
            continue;
        }
        let mut rendered = String::new();
        if let Some(mode) = mode {
            rendered.push_str(&mode);
            rendered.push(' ');
        }
        if let Some(param_name) = param_name {
            rendered.push_str(&quote_ident(&param_name));
            rendered.push(' ');
        }
        rendered.push_str(&data_type);
        by_routine.entry((name, routine_type)).or_default().push(rendered);
    }
    Ok(by_routine
        .into_iter()
        .map(|(key, params)| (key, params.join(", ")))
        .collect())
}

async fn show_create_routine(
    conn: &mut Conn,
    schema_name: &str,
    name: &str,
    object_type: ObjectType,
) -> Result<String> {
    let row: Option<Row> = conn
        .query_first(format!(
            "SHOW CREATE {} {}.{}",
            object_type.keyword(),
            quote_ident(schema_name),
            quote_ident(name)
        ))
        .await?;
    Ok(row
        .and_then(|r| r.get::<Option<String>, _>(2).flatten())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests;
