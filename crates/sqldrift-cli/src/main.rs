//! sqldrift CLI entry point

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sqldrift_apply::{
    ApplyResult, DirConfig, Outcome, Printer, PrinterMode, TargetOptions, apply_all,
    target_groups, targets_for_dir,
};
use sqldrift_core::{Error, SessionParams};
use sqldrift_lint::{Severity, check_schema, register_all_rules};
use sqldrift_workspace::{WorkspaceType, run_shutdown_hooks};

mod cli;
mod config;
mod fs;

use cli::{Cli, Commands, OperationArgs};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    register_all_rules();

    let code = tokio::select! {
        code = run(&cli) => code,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted");
            130
        }
    };

    run_shutdown_hooks().await;
    ExitCode::from(code.clamp(0, 255) as u8)
}

async fn run(cli: &Cli) -> i32 {
    let result = match &cli.command {
        Commands::Diff(args) => run_operation(cli, args, true).await,
        Commands::Push(args) => run_operation(cli, args, false).await,
        Commands::Lint(args) => run_lint(cli, args).await,
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err}");
            match err {
                Error::Config(_) => 78,
                _ => 2,
            }
        }
    }
}

async fn run_operation(cli: &Cli, args: &OperationArgs, dry_run: bool) -> Result<i32, Error> {
    let opts = build_target_options(args, dry_run)?;
    let dir = fs::load_dir(&cli.dir, &build_dir_config(args), &opts);

    let (targets, skip_count) = targets_for_dir(&dir, cli.max_depth).await;
    let mut result = ApplyResult {
        skip_count,
        ..ApplyResult::default()
    };
    if skip_count > 0 {
        result = result.with_outcome(Outcome::WorkspaceFatal);
    }
    if targets.is_empty() && skip_count == 0 {
        tracing::warn!(dir = %cli.dir.display(), "nothing is mapped to a host and schema");
        return Ok(0);
    }

    let mode = if dry_run && args.brief {
        PrinterMode::Brief
    } else {
        PrinterMode::Standard
    };
    let printer = Arc::new(Printer::new(mode));

    let groups = target_groups(targets);
    let applied = apply_all(groups, opts.concurrent_servers, printer).await;
    result = result.merge(applied);

    tracing::info!(
        differences = result.differences,
        skipped = result.skip_count,
        unsupported = result.unsupported_count,
        "operation complete"
    );
    Ok(result.worst_outcome.exit_code(dry_run, result.differences))
}

async fn run_lint(cli: &Cli, args: &OperationArgs) -> Result<i32, Error> {
    let opts = build_target_options(args, true)?;
    let dir = fs::load_dir(&cli.dir, &build_dir_config(args), &opts);

    let (targets, skip_count) = targets_for_dir(&dir, cli.max_depth).await;
    let mut errors = 0usize;
    let mut warnings = 0usize;
    for target in &targets {
        let mut lint_opts = target.opts.lint_options.clone();
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
        errors += lint_result.error_count();
        warnings += lint_result.warning_count();
    }

    tracing::info!(errors, warnings, skipped = skip_count, "lint complete");
    if skip_count > 0 {
        Ok(4)
    } else if errors > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn build_dir_config(args: &OperationArgs) -> DirConfig {
    DirConfig {
        first_only: args.first_only,
        ..DirConfig::default()
    }
}

fn build_target_options(args: &OperationArgs, dry_run: bool) -> Result<TargetOptions, Error> {
    let mut opts = TargetOptions {
        allow_unsafe: args.allow_unsafe,
        safe_below_size: args.safe_below_size,
        alter_wrapper: args.alter_wrapper.clone(),
        alter_wrapper_min_size: args.alter_wrapper_min_size,
        ddl_wrapper: args.ddl_wrapper.clone(),
        alter_algorithm: args.alter_algorithm.parse()?,
        alter_lock: args.alter_lock.parse()?,
        partitioning: args.partitioning.parse()?,
        verify: !args.skip_verify,
        lint: !args.skip_lint,
        brief: args.brief,
        dry_run,
        foreign_key_checks: args.foreign_key_checks,
        lax_column_order: args.lax_column_order,
        lax_comments: args.lax_comments,
        exact_match: args.exact_match,
        compare_metadata: args.compare_metadata,
        alter_validate_virtual: args.alter_validate_virtual,
        environment: args.environment.clone(),
        concurrent_servers: args.concurrent_servers.max(1),
        ..TargetOptions::default()
    };

    if let Some(connect_options) = &args.connect_options {
        opts.connect_params = SessionParams::parse(connect_options)?;
        opts.workspace.session_params = opts.connect_params.clone();
    }

    opts.workspace.workspace_type = args.workspace.parse()?;
    opts.workspace.default_charset = args.default_character_set.clone();
    opts.workspace.default_collation = args.default_collation.clone();
    opts.workspace.schema_name = args.temp_schema.clone();
    opts.workspace.mode = args.temp_schema_mode.parse()?;
    opts.workspace.threads = args.temp_schema_threads;
    opts.workspace.reuse_temp_schema = args.reuse_temp_schema;
    opts.workspace.container_cleanup = args.docker_cleanup.parse()?;
    opts.workspace.disable_binlog = match args.temp_schema_binlog.as_str() {
        "on" => false,
        "off" | "auto" => true,
        other => {
            return Err(Error::Config(format!(
                "invalid temp-schema-binlog '{other}'"
            )));
        }
    };
    if let Some(flavor) = &args.flavor {
        opts.workspace.flavor = flavor.parse()?;
    } else if opts.workspace.workspace_type == WorkspaceType::LocalDocker {
        return Err(Error::Config(
            "workspace=docker requires a flavor, e.g. --flavor mysql:8.0".to_string(),
        ));
    }

    Ok(opts)
}
