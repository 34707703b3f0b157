//! Workspace executor: materialize a desired-state bundle
//!
//! CREATE TABLEs run on a bounded worker pool, optionally batched into
//! multi-statement chunks. Stored programs always run one per round trip:
//! batching a compound body would let a typo end the program early and
//! leak its remaining statements to the server. A final object-count
//! check catches any such silent divergence.

use std::sync::Arc;
use std::time::{Duration, Instant};

use mysql_async::Pool;
use mysql_async::prelude::Queryable;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use sqldrift_core::{Error, LogicalSchema, SessionParams, Statement};

use crate::error::{Result, WorkspaceError};
use crate::{Workspace, WorkspaceOpts, WorkspaceSchema, create};

/// One statement that failed during populate, with the server's verdict.
#[derive(Debug)]
pub struct StatementFailure {
    pub statement: Statement,
    pub message: String,
    pub code: Option<u16>,
}

impl StatementFailure {
    fn new(statement: Statement, error: &Error) -> Self {
        Self {
            statement,
            message: error.to_string(),
            code: error.server_code(),
        }
    }
}

/// Wall-clock timings of the executor phases.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timings {
    pub init: Duration,
    pub populate: Duration,
    pub introspect: Duration,
    pub cleanup: Duration,
}

/// Outcome of materializing a desired-state bundle in a workspace.
#[derive(Debug)]
pub struct ExecResult {
    pub schema: WorkspaceSchema,
    pub failures: Vec<StatementFailure>,
    pub timings: Timings,
}

/// Acquire a workspace, execute every statement of `logical` in it,
/// introspect the outcome, and release the workspace.
#[tracing::instrument(skip_all, fields(schema = ?logical.name))]
pub async fn exec_logical_schema(
    opts: &WorkspaceOpts,
    logical: &LogicalSchema,
) -> Result<ExecResult> {
    let mut timings = Timings::default();

    let phase_start = Instant::now();
    let mut workspace = create(opts).await?;
    timings.init = phase_start.elapsed();

    let phase_start = Instant::now();
    let populated = populate(workspace.as_ref(), opts, logical).await;
    timings.populate = phase_start.elapsed();
    let (failures, create_failure_count) = match populated {
        Ok(outcome) => outcome,
        Err(err) => {
            let _ = workspace.cleanup().await;
            return Err(err);
        }
    };

    let phase_start = Instant::now();
    let introspected = workspace.introspect().await;
    timings.introspect = phase_start.elapsed();
    let schema = match introspected {
        Ok(schema) => schema,
        Err(err) => {
            let _ = workspace.cleanup().await;
            return Err(err);
        }
    };

    // Every submitted CREATE must be accounted for: either an object
    // exists, or a failure was recorded. Anything else means a statement
    // did something other than create its own object.
    let expected = logical.creates.len() - create_failure_count;
    let actual = schema.schema.object_count();
    if actual != expected {
        let _ = workspace.cleanup().await;
        return Err(WorkspaceError::ObjectCountMismatch { expected, actual });
    }

    let phase_start = Instant::now();
    workspace.cleanup().await?;
    timings.cleanup = phase_start.elapsed();

    Ok(ExecResult {
        schema,
        failures,
        timings,
    })
}

async fn populate(
    workspace: &dyn Workspace,
    opts: &WorkspaceOpts,
    logical: &LogicalSchema,
) -> Result<(Vec<StatementFailure>, usize)> {
    let mut exec_params = SessionParams::new();
    exec_params.set("foreign_key_checks", "0");
    let pool = workspace.connection_pool(&exec_params).await?;

    let mut chunk_size = opts.mode.chunk_size();
    if chunk_size > 1 && !supports_multi_statement(&pool).await {
        tracing::warn!(
            "multi-statement batches rejected by server or proxy; using one statement per round trip"
        );
        chunk_size = 1;
    }

    let threads = opts.effective_threads().max(1);
    let semaphore = Arc::new(Semaphore::new(threads));
    let mut workers: JoinSet<Vec<(Statement, Error)>> = JoinSet::new();

    let chunkable: Vec<Statement> = logical.chunkable_creates().cloned().collect();
    for chunk in chunkable.chunks(chunk_size.max(1)) {
        let chunk = chunk.to_vec();
        let pool = pool.clone();
        let semaphore = semaphore.clone();
        workers.spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return Vec::new();
            };
            run_chunk(&pool, chunk).await
        });
    }

    for statement in logical.non_chunkable_creates().cloned() {
        let pool = pool.clone();
        let semaphore = semaphore.clone();
        workers.spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return Vec::new();
            };
            match run_statement(&pool, &statement.text).await {
                Ok(()) => Vec::new(),
                Err(err) => vec![(statement, err)],
            }
        });
    }

    let mut raw_failures: Vec<(Statement, Error)> = Vec::new();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(failures) => raw_failures.extend(failures),
            Err(join_err) => {
                return Err(WorkspaceError::Core(Error::Other(format!(
                    "populate worker panicked: {join_err}"
                ))));
            }
        }
    }

    // Lock conflicts are expected on servers that extend FK metadata
    // locks to parent tables, and missing objects happen when a
    // CREATE TABLE ... LIKE ran before its source. Both get one
    // sequential retry; everything else is final.
    let mut failures: Vec<StatementFailure> = Vec::new();
    for (statement, error) in raw_failures {
        if error.is_lock_conflict() || error.is_missing_object() {
            tracing::debug!(statement = %statement, error = %error, "retrying statement sequentially");
            if let Err(retry_err) = run_statement(&pool, &statement.text).await {
                failures.push(StatementFailure::new(statement, &retry_err));
            }
        } else {
            failures.push(StatementFailure::new(statement, &error));
        }
    }
    let create_failure_count = failures.len();

    // ALTERs mutate foreign keys and do not tolerate concurrency; run
    // them strictly in order.
    for statement in &logical.alters {
        if let Err(err) = run_statement(&pool, &statement.text).await {
            failures.push(StatementFailure::new(statement.clone(), &err));
        }
    }

    Ok((failures, create_failure_count))
}

/// Execute a chunk as one multi-statement batch. On failure the chunk is
/// replayed one statement at a time with `IF NOT EXISTS`, so statements
/// that already succeeded inside the failed batch are skipped.
async fn run_chunk(pool: &Pool, statements: Vec<Statement>) -> Vec<(Statement, Error)> {
    if statements.len() == 1 {
        let Some(statement) = statements.into_iter().next() else {
            return Vec::new();
        };
        return match run_statement(pool, &statement.text).await {
            Ok(()) => Vec::new(),
            Err(err) => vec![(statement, err)],
        };
    }

    let batch = statements
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(";\n");
    if run_statement(pool, &batch).await.is_ok() {
        return Vec::new();
    }

    let mut failures = Vec::new();
    for statement in statements {
        if let Err(err) = run_statement(pool, &add_if_not_exists(&statement.text)).await {
            failures.push((statement, err));
        }
    }
    failures
}

async fn run_statement(pool: &Pool, sql: &str) -> std::result::Result<(), Error> {
    let mut conn = pool.get_conn().await?;
    conn.query_drop(sql).await?;
    Ok(())
}

/// Probe whether the connection path accepts multi-statement batches.
/// Proxies in particular often reject them.
async fn supports_multi_statement(pool: &Pool) -> bool {
    run_statement(pool, "SELECT 1;\nSELECT 1").await.is_ok()
}

fn add_if_not_exists(text: &str) -> String {
    let trimmed = text.trim_start();
    let upper = trimmed.to_uppercase();
    if upper.starts_with("CREATE TABLE") && !upper.starts_with("CREATE TABLE IF NOT EXISTS") {
        format!("CREATE TABLE IF NOT EXISTS{}", &trimmed["CREATE TABLE".len()..])
    } else {
        text.to_string()
    }
}
