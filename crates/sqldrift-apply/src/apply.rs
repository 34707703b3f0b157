//! The applier: per-target orchestration
//!
//! lint → diff → verify → safety gate → print/execute, with partial
//! failure confined to the target it happened on.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use sqldrift_core::{ObjectType, Schema};
use sqldrift_diff::{DiffType, PartitioningMode, diff_schemas};
use sqldrift_lint::{Severity, check_schema};

use crate::ddl::{PlannedUnit, StatementClass, plan_statement};
use crate::plan::{Target, TargetGroup};
use crate::printer::Printer;
use crate::result::{ApplyResult, Outcome};
use crate::verify::verify_diff;

/// Apply (or dry-run) one target. Failures are logged and reflected in
/// the result; they never propagate to other targets.
#[tracing::instrument(skip_all, fields(instance = %target.instance, schema = %target.schema_name))]
pub async fn apply_target(target: &Target, printer: &Printer) -> ApplyResult {
    let opts = &target.opts;
    let mut result = ApplyResult::default();

    let live = match target.instance.introspect_schema(&target.schema_name).await {
        Ok(Some(schema)) => schema,
        // A schema that does not exist yet diffs as empty: everything
        // desired becomes a CREATE.
        Ok(None) => Schema {
            name: target.schema_name.clone(),
            ..Schema::default()
        },
        Err(err) => {
            tracing::error!(error = %err, "cannot introspect live schema");
            result.skip_count += 1;
            return result.with_outcome(Outcome::WorkspaceFatal);
        }
    };

    let mut desired = target.desired.clone();
    if opts.partitioning == PartitioningMode::Remove {
        for table in &mut desired.tables {
            table.partitioning = None;
        }
    }

    let diff = diff_schemas(&live, &desired);
    if diff.is_empty() {
        return result;
    }

    let flavor = match target.instance.flavor().await {
        Ok(flavor) => flavor,
        Err(err) => {
            tracing::error!(error = %err, "cannot detect server flavor");
            result.skip_count += 1;
            return result.with_outcome(Outcome::WorkspaceFatal);
        }
    };
    let mods = opts.statement_modifiers(flavor);

    let mut verified = HashSet::new();
    let mut verify_ran = false;
    if opts.verify && diff.table_alters().next().is_some() {
        match verify_diff(&diff, target).await {
            Ok(outcome) => {
                verified = outcome.verified;
                verify_ran = true;
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    "diff verification failed; use skip-verify to bypass"
                );
                result.differences = true;
                result.skip_count += diff.len();
                return result.with_outcome(Outcome::WorkspaceFatal);
            }
        }
    }

    let mut units: Vec<PlannedUnit> = Vec::new();
    let mut unsafe_reasons: Vec<String> = Vec::new();
    for object_diff in diff.object_diffs() {
        let table_size = table_size_for(object_diff, target).await;
        let unit = match plan_statement(object_diff, target, &mods, table_size, &verified) {
            Ok(unit) => unit,
            Err(err) => {
                tracing::error!(key = %object_diff.key, error = %err, "cannot plan statement");
                result.differences = true;
                result.skip_count += diff.len();
                return result.with_outcome(Outcome::ConfigError);
            }
        };
        match unit.class {
            StatementClass::NoOp => continue,
            StatementClass::Safe => {
                result.differences = true;
                // A supported alter that verification could not prove is
                // fatal for the whole target.
                if verify_ran
                    && object_diff.diff_type == DiffType::Alter
                    && object_diff.key.object_type == ObjectType::Table
                    && !verified.contains(&object_diff.key)
                {
                    tracing::error!(
                        key = %object_diff.key,
                        "generated alter failed verification; use skip-verify to bypass"
                    );
                    result.skip_count += diff.len();
                    return result.with_outcome(Outcome::WorkspaceFatal);
                }
                units.push(unit);
            }
            StatementClass::Unsafe => {
                result.differences = true;
                if let Some(reason) = &unit.reason {
                    unsafe_reasons.push(format!("{}: {reason}", unit.key));
                }
                units.push(unit);
            }
            StatementClass::Unsupported => {
                result.differences = true;
                result.unsupported_count += 1;
                tracing::warn!(
                    key = %unit.key,
                    reason = unit.reason.as_deref().unwrap_or(""),
                    "skipping unsupported diff"
                );
            }
            StatementClass::Fatal => {
                tracing::error!(
                    key = %unit.key,
                    reason = unit.reason.as_deref().unwrap_or(""),
                    "fatal error planning statement"
                );
                result.differences = true;
                result.skip_count += diff.len();
                return result.with_outcome(Outcome::WorkspaceFatal);
            }
        }
    }

    let mut lint_errors = 0;
    if opts.lint {
        let mut lint_opts = opts.lint_options.clone();
        lint_opts.only_keys = Some(diff.object_diffs().iter().map(|d| d.key.clone()).collect());
        if let Ok(mode) = target.instance.name_case().await {
            lint_opts.name_case = mode;
        }
        let lint_result = check_schema(&target.logical, &target.desired, &lint_opts);
        for annotation in &lint_result.annotations {
            let message = annotation.message_text(lint_opts.strip_newlines);
            match annotation.severity {
                Severity::Error => tracing::error!(
                    rule = %annotation.rule_name,
                    location = %annotation.location(),
                    "{message}"
                ),
                _ => tracing::warn!(
                    rule = %annotation.rule_name,
                    location = %annotation.location(),
                    "{message}"
                ),
            }
        }
        lint_errors = lint_result.error_count();
        if lint_result.warning_count() > 0 {
            result = result.with_outcome(Outcome::SuccessWithWarnings);
        }
    }

    // The gate: unsafe statements without allow-unsafe, or lint errors,
    // keep every statement of this target from executing.
    if !unsafe_reasons.is_empty() || lint_errors > 0 {
        for reason in &unsafe_reasons {
            tracing::error!(
                "unsafe statement blocked: {reason}; use allow-unsafe or safe-below-size to permit"
            );
        }
        if lint_errors > 0 {
            tracing::error!(count = lint_errors, "lint errors block this target");
        }
        result.skip_count += units.iter().filter(|u| u.statement.is_some()).count();
        return result.with_outcome(Outcome::UnsafeBlocked);
    }

    let executable: Vec<&PlannedUnit> = units.iter().filter(|u| u.statement.is_some()).collect();
    for (index, unit) in executable.iter().enumerate() {
        let Some(statement) = &unit.statement else {
            continue;
        };
        printer.print_statement(statement);
        if opts.dry_run {
            continue;
        }
        if let Err(err) = statement.execute().await {
            tracing::error!(
                statement = %statement.statement(),
                delimiter = %statement.client_state().delimiter,
                error = %err,
                "statement failed; skipping the rest of this target"
            );
            result.skip_count += executable.len() - index - 1;
            printer.finish();
            return result.with_outcome(Outcome::StatementError);
        }
    }
    printer.finish();

    if result.unsupported_count > 0 {
        result = result.with_outcome(Outcome::SuccessWithWarnings);
    }
    result
}

/// Fetch the live table size when any size-dependent option needs it.
async fn table_size_for(
    object_diff: &sqldrift_diff::ObjectDiff,
    target: &Target,
) -> Option<u64> {
    let opts = &target.opts;
    if object_diff.key.object_type != ObjectType::Table {
        return None;
    }
    let wrapper_wants_size = [&opts.alter_wrapper, &opts.ddl_wrapper]
        .into_iter()
        .flatten()
        .any(|w| w.to_uppercase().contains("{SIZE}"));
    let needed =
        opts.safe_below_size.is_some() || opts.alter_wrapper.is_some() || wrapper_wants_size;
    if !needed || object_diff.from.is_none() {
        return None;
    }
    match target
        .instance
        .table_size(&target.schema_name, &object_diff.key.name)
        .await
    {
        Ok(size) => Some(size),
        Err(err) => {
            tracing::warn!(
                table = %object_diff.key.name,
                error = %err,
                "cannot determine table size"
            );
            None
        }
    }
}

/// Apply all target groups, fanning out across instances up to
/// `concurrent_servers` at a time. Targets within one group run
/// sequentially.
pub async fn apply_all(
    groups: Vec<TargetGroup>,
    concurrent_servers: usize,
    printer: Arc<Printer>,
) -> ApplyResult {
    let semaphore = Arc::new(Semaphore::new(concurrent_servers.max(1)));
    let mut workers: JoinSet<ApplyResult> = JoinSet::new();

    for group in groups {
        let printer = printer.clone();
        let semaphore = semaphore.clone();
        workers.spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return ApplyResult::default();
            };
            let mut merged = ApplyResult::default();
            for target in &group.targets {
                merged = merged.merge(apply_target(target, &printer).await);
            }
            merged
        });
    }

    let mut merged = ApplyResult::default();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(result) => merged = merged.merge(result),
            Err(join_err) => {
                tracing::error!(error = %join_err, "apply worker panicked");
                merged = merged.with_outcome(Outcome::WorkspaceFatal);
            }
        }
    }
    merged
}
