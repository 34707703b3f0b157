//! Planned DDL statements
//!
//! Each object diff becomes at most one planned statement: either SQL run
//! directly against the target instance, or a shell-out to an external
//! wrapper program with a fixed set of template variables substituted.

use std::collections::HashSet;

use mysql_async::prelude::Queryable;

use sqldrift_core::{Error, Instance, ObjectKey, ObjectType, Result, SessionParams};
use sqldrift_diff::{
    AlgorithmClause, DiffType, LockClause, ObjectDiff, StatementError, StatementModifiers,
};

use crate::plan::Target;

/// Client-visible state a statement runs under, used by printers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientState {
    pub instance_id: String,
    pub default_schema: String,
    /// `;` for plain SQL, `//` for compound bodies, empty for shell-outs
    pub delimiter: String,
}

/// A statement run directly over a connection.
#[derive(Debug, Clone)]
pub struct DirectStatement {
    pub instance: Instance,
    pub schema: String,
    pub sql: String,
    pub params: SessionParams,
    pub compound: bool,
}

/// A shell-out to an external wrapper program.
#[derive(Debug, Clone)]
pub struct ShellOutStatement {
    pub command: String,
    pub instance_id: String,
    pub schema: String,
}

/// An executable unit of planned work.
#[derive(Debug, Clone)]
pub enum PlannedStatement {
    Direct(DirectStatement),
    ShellOut(ShellOutStatement),
}

impl PlannedStatement {
    /// Execute this statement. Direct statements use the shared pool for
    /// their (instance, schema, params) tuple; shell-outs run through the
    /// system shell.
    pub async fn execute(&self) -> Result<()> {
        match self {
            PlannedStatement::Direct(direct) => {
                let pool = direct
                    .instance
                    .connection_pool(Some(&direct.schema), &direct.params)
                    .await?;
                let mut conn = pool.get_conn().await?;
                conn.query_drop(&direct.sql).await?;
                Ok(())
            }
            PlannedStatement::ShellOut(shell) => {
                tracing::debug!(command = %shell.command, "running wrapper command");
                let status = tokio::process::Command::new("/bin/sh")
                    .arg("-c")
                    .arg(&shell.command)
                    .status()
                    .await
                    .map_err(|err| Error::Other(format!("cannot run wrapper: {err}")))?;
                if !status.success() {
                    return Err(Error::Other(format!(
                        "wrapper command exited with {status}: {}",
                        shell.command
                    )));
                }
                Ok(())
            }
        }
    }

    /// The statement as shown to the user, without a trailing delimiter.
    pub fn statement(&self) -> String {
        match self {
            PlannedStatement::Direct(direct) => direct.sql.clone(),
            PlannedStatement::ShellOut(shell) => format!("\\! {}", shell.command),
        }
    }

    pub fn client_state(&self) -> ClientState {
        match self {
            PlannedStatement::Direct(direct) => ClientState {
                instance_id: direct.instance.id(),
                default_schema: direct.schema.clone(),
                delimiter: if direct.compound { "//" } else { ";" }.to_string(),
            },
            PlannedStatement::ShellOut(shell) => ClientState {
                instance_id: shell.instance_id.clone(),
                default_schema: shell.schema.clone(),
                delimiter: String::new(),
            },
        }
    }
}

/// Safety classification of one object diff after statement construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementClass {
    /// The diff renders to nothing under the current modifiers
    NoOp,
    Safe,
    /// Data-destructive and not permitted by configuration
    Unsafe,
    /// Cannot be generated faithfully
    Unsupported,
    Fatal,
}

/// One object diff, classified, with its planned statement when runnable.
#[derive(Debug)]
pub struct PlannedUnit {
    pub key: ObjectKey,
    pub class: StatementClass,
    pub statement: Option<PlannedStatement>,
    /// Why the statement is unsafe, unsupported, or fatal
    pub reason: Option<String>,
}

/// Build the planned statement for one object diff.
///
/// `table_size` must be provided when size-based options are configured;
/// `verified` carries keys the verifier proved despite an unsupported
/// classification.
pub fn plan_statement(
    diff: &ObjectDiff,
    target: &Target,
    mods: &StatementModifiers,
    table_size: Option<u64>,
    verified: &HashSet<ObjectKey>,
) -> Result<PlannedUnit> {
    let opts = &target.opts;

    // A small enough table waives the unsafe gate for this diff only.
    let mut mods = mods.clone();
    if let (Some(threshold), Some(size)) = (opts.safe_below_size, table_size)
        && size < threshold
    {
        mods.allow_unsafe = true;
    }

    // An external OSC tool picks its own algorithm and locking.
    let uses_alter_wrapper = opts.alter_wrapper.is_some()
        && diff.diff_type == DiffType::Alter
        && diff.key.object_type == ObjectType::Table
        && table_size.unwrap_or(0) >= opts.alter_wrapper_min_size;
    if uses_alter_wrapper {
        mods.algorithm_clause = AlgorithmClause::Unset;
        mods.lock_clause = LockClause::Unset;
    }

    let (sql, class, reason) = match diff.statement(&mods) {
        Ok(sql) if sql.is_empty() => {
            return Ok(PlannedUnit {
                key: diff.key.clone(),
                class: StatementClass::NoOp,
                statement: None,
                reason: None,
            });
        }
        Ok(sql) => (sql, StatementClass::Safe, None),
        Err(StatementError::Unsafe { sql, reason }) => {
            (sql, StatementClass::Unsafe, Some(reason))
        }
        Err(err @ StatementError::Unsupported { .. }) => {
            // The verifier may have proven this diff correct after all.
            let sql = err.sql().unwrap_or_default().to_string();
            if verified.contains(&diff.key) && !sql.is_empty() {
                (sql, StatementClass::Safe, None)
            } else {
                return Ok(PlannedUnit {
                    key: diff.key.clone(),
                    class: StatementClass::Unsupported,
                    statement: None,
                    reason: Some(err.to_string()),
                });
            }
        }
        Err(StatementError::Fatal(message)) => {
            return Ok(PlannedUnit {
                key: diff.key.clone(),
                class: StatementClass::Fatal,
                statement: None,
                reason: Some(message),
            });
        }
    };

    let wrapper = if uses_alter_wrapper {
        opts.alter_wrapper.as_deref()
    } else {
        opts.ddl_wrapper.as_deref()
    };

    let statement = match wrapper {
        Some(template) => {
            let vars = WrapperVars::for_diff(diff, target, &sql, table_size);
            let command = substitute_wrapper(template, &vars)?;
            PlannedStatement::ShellOut(ShellOutStatement {
                command,
                instance_id: target.instance.id(),
                schema: target.schema_name.clone(),
            })
        }
        None => {
            let mut params = opts.connect_params.clone();
            if opts.foreign_key_checks
                && diff.diff_type == DiffType::Alter
                && sql.contains("FOREIGN KEY")
            {
                params.set("foreign_key_checks", "1");
            }
            PlannedStatement::Direct(DirectStatement {
                instance: target.instance.clone(),
                schema: target.schema_name.clone(),
                sql,
                params,
                compound: diff.key.object_type.is_stored_program()
                    && diff.diff_type == DiffType::Create,
            })
        }
    };

    Ok(PlannedUnit {
        key: diff.key.clone(),
        class,
        statement: Some(statement),
        reason,
    })
}

/// The fixed template variable set for wrapper commands.
#[derive(Debug, Clone, Default)]
pub struct WrapperVars {
    pub host: String,
    pub port: String,
    pub socket: String,
    pub schema: String,
    pub user: String,
    pub password: String,
    pub environment: String,
    /// The full generated statement
    pub ddl: String,
    /// ALTER clauses without the `ALTER TABLE name` prefix; only set for
    /// ALTER TABLE
    pub clauses: String,
    pub name: String,
    /// Object name; only set for ALTER TABLE
    pub table: String,
    pub size: String,
    /// CREATE, ALTER, or DROP
    pub r#type: String,
    /// table, procedure, or function
    pub class: String,
    pub connopts: String,
    pub dirname: String,
    pub dirpath: String,
}

impl WrapperVars {
    pub fn for_diff(
        diff: &ObjectDiff,
        target: &Target,
        sql: &str,
        table_size: Option<u64>,
    ) -> WrapperVars {
        let is_alter_table =
            diff.diff_type == DiffType::Alter && diff.key.object_type == ObjectType::Table;
        let clauses = if is_alter_table {
            alter_clauses(sql, &diff.key.name)
        } else {
            String::new()
        };
        WrapperVars {
            host: target.instance.host().to_string(),
            port: target.instance.port().to_string(),
            socket: String::new(),
            schema: target.schema_name.clone(),
            user: target.instance.user().to_string(),
            password: target.instance.password().unwrap_or("").to_string(),
            environment: target.opts.environment.clone(),
            ddl: sql.to_string(),
            clauses,
            name: diff.key.name.clone(),
            table: if is_alter_table {
                diff.key.name.clone()
            } else {
                String::new()
            },
            size: table_size.unwrap_or(0).to_string(),
            r#type: diff.diff_type.to_string(),
            class: diff.key.object_type.as_str().to_string(),
            connopts: target.opts.connect_params.signature(),
            dirname: target
                .dir_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            dirpath: target.dir_path.to_string_lossy().into_owned(),
        }
    }

    fn lookup(&self, variable: &str) -> Option<&str> {
        let value = match variable.to_uppercase().as_str() {
            "HOST" => &self.host,
            "PORT" => &self.port,
            "SOCKET" => &self.socket,
            "SCHEMA" => &self.schema,
            "USER" => &self.user,
            "PASSWORD" => &self.password,
            "ENVIRONMENT" => &self.environment,
            "DDL" => &self.ddl,
            "CLAUSES" => &self.clauses,
            "NAME" => &self.name,
            "TABLE" => &self.table,
            "SIZE" => &self.size,
            "TYPE" => &self.r#type,
            "CLASS" => &self.class,
            "CONNOPTS" => &self.connopts,
            "DIRNAME" => &self.dirname,
            "DIRPATH" => &self.dirpath,
            _ => return None,
        };
        Some(value)
    }
}

/// Strip the `ALTER TABLE name ` prefix, leaving just the clause list.
fn alter_clauses(sql: &str, table_name: &str) -> String {
    let prefix = format!("ALTER TABLE {} ", sqldrift_core::quote_ident(table_name));
    sql.strip_prefix(&prefix).unwrap_or(sql).to_string()
}

/// Substitute `{VARIABLE}` tokens in a wrapper command template. Values
/// are shell-quoted. Unknown variables are a configuration error.
pub fn substitute_wrapper(template: &str, vars: &WrapperVars) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            return Err(Error::Config(format!(
                "wrapper command has unterminated variable near '{}'",
                &rest[start..]
            )));
        };
        let variable = &after[..end];
        let value = vars.lookup(variable).ok_or_else(|| {
            Error::Config(format!("wrapper command uses unknown variable {{{variable}}}"))
        })?;
        out.push_str(&shell_quote(value));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Quote a value for the POSIX shell.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
