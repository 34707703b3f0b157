//! Diff verification
//!
//! A second pass that replays generated ALTERs against snapshots of the
//! live tables in a fresh workspace, then re-diffs the result against the
//! desired state. A clean second diff proves the generated DDL is
//! complete and correct before anything touches production.

use std::collections::HashSet;
use std::path::PathBuf;

use sqldrift_core::{Error, LogicalSchema, ObjectKey, ObjectType, Result, Schema, Statement, Table};
use sqldrift_diff::{SchemaDiff, StatementModifiers, diff_schemas};
use sqldrift_workspace::{WorkspaceType, exec_logical_schema};

use crate::plan::Target;

/// Which table alters verification proved correct.
#[derive(Debug, Default)]
pub struct VerifyOutcome {
    pub verified: HashSet<ObjectKey>,
}

/// Replay every table alter of `diff` in a workspace and prove each one
/// brings its table exactly to the desired state.
///
/// Alters that were classified unsupported are replayed with their
/// best-effort SQL; proving one clean upgrades it to supported.
#[tracing::instrument(skip_all, fields(schema = %target.schema_name))]
pub async fn verify_diff(diff: &SchemaDiff, target: &Target) -> Result<VerifyOutcome> {
    let alters: Vec<_> = diff.table_alters().collect();
    if alters.is_empty() {
        return Ok(VerifyOutcome::default());
    }

    let flavor = target.instance.flavor().await?;
    let generate_mods = StatementModifiers::strict_for_verification(flavor);

    let mut outcome = VerifyOutcome::default();
    let mut logical = LogicalSchema::new(None);
    let mut replayed: Vec<(Table, Table)> = Vec::new();

    for alter in &alters {
        let (Some(from), Some(to)) = (
            alter.from.as_ref().and_then(|o| o.as_table()),
            alter.to.as_ref().and_then(|o| o.as_table()),
        ) else {
            continue;
        };

        let sql = match alter.statement(&generate_mods) {
            Ok(sql) if sql.is_empty() => {
                // Nothing to replay means nothing can go wrong.
                outcome.verified.insert(alter.key.clone());
                continue;
            }
            Ok(sql) => sql,
            Err(err) => match err.sql() {
                Some(sql) => sql.to_string(),
                None => continue,
            },
        };

        logical.add_create(verify_statement(&from.name, 1, &from.create_statement));
        logical.add_alter(verify_statement(&from.name, 2, &sql));
        replayed.push((from.clone(), to.clone()));
    }

    if replayed.is_empty() {
        return Ok(outcome);
    }

    let mut workspace_opts = target.opts.workspace.clone();
    if workspace_opts.workspace_type == WorkspaceType::TempSchema
        && workspace_opts.instance.is_none()
    {
        workspace_opts.instance = Some(target.instance.clone());
    }

    let result = exec_logical_schema(&workspace_opts, &logical)
        .await
        .map_err(|err| Error::Other(format!("verification workspace failed: {err}")))?;
    if let Some(failure) = result.failures.first() {
        return Err(Error::Other(format!(
            "verification replay failed on {}: {}",
            failure.statement, failure.message
        )));
    }

    let recheck_mods = StatementModifiers::strict_for_reverification(flavor);
    for (from, to) in replayed {
        let Some(replayed_table) = result.schema.schema.table(&from.name) else {
            continue;
        };
        let second = diff_schemas(
            &single_table_schema(replayed_table.clone()),
            &single_table_schema(to),
        );
        let clean = second.object_diffs().iter().all(|d| {
            d.statement(&recheck_mods)
                .map(|sql| sql.trim().is_empty())
                .unwrap_or(false)
        });
        if clean {
            outcome.verified.insert(ObjectKey::table(&from.name));
        } else {
            tracing::warn!(
                table = %from.name,
                "replayed alter does not reproduce the desired table"
            );
        }
    }

    Ok(outcome)
}

fn verify_statement(table_name: &str, line_no: usize, text: &str) -> Statement {
    Statement {
        text: text.to_string(),
        file: PathBuf::from("<verification>"),
        line_no,
        object_type: ObjectType::Table,
        object_name: table_name.to_string(),
        schema_qualifier: None,
        compound: false,
    }
}

fn single_table_schema(table: Table) -> Schema {
    Schema {
        name: "verify".to_string(),
        charset: String::new(),
        collation: String::new(),
        tables: vec![table],
        routines: Vec::new(),
    }
}
