//! The planner: expand a directory tree into per-server targets

use std::collections::HashSet;
use std::path::PathBuf;

use sqldrift_core::{Flavor, Instance, LogicalSchema, Schema};
use sqldrift_workspace::{WorkspaceType, exec_logical_schema};

use crate::options::TargetOptions;

/// Connection and mapping configuration of one directory, as resolved by
/// the configuration layer.
#[derive(Debug, Clone)]
pub struct DirConfig {
    /// Host specs, each `host` or `host:port`
    pub hosts: Vec<String>,
    /// Default port for hosts without an explicit one
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    /// Schema this directory maps, for unnamed desired-state bundles
    pub schema: Option<String>,
    /// Use only the first reachable host instead of fanning out
    pub first_only: bool,
    /// Expected server flavor, checked against reality with a warning
    pub flavor: Option<Flavor>,
}

impl Default for DirConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            port: 3306,
            user: "root".to_string(),
            password: None,
            schema: None,
            first_only: false,
            flavor: None,
        }
    }
}

impl DirConfig {
    pub fn has_host(&self) -> bool {
        !self.hosts.is_empty()
    }

    fn instance_for(&self, host_spec: &str) -> Instance {
        let (host, port) = match host_spec.rsplit_once(':') {
            Some((host, port_str)) => match port_str.parse() {
                Ok(port) => (host, port),
                Err(_) => (host_spec, self.port),
            },
            None => (host_spec, self.port),
        };
        Instance::new(host, port, &self.user, self.password.clone())
    }
}

/// One directory of the desired-state tree, as produced by the
/// filesystem layer.
#[derive(Debug, Clone, Default)]
pub struct Dir {
    pub path: PathBuf,
    pub config: DirConfig,
    pub options: TargetOptions,
    pub logical_schemas: Vec<LogicalSchema>,
    /// Set when the directory's files could not be parsed; the whole
    /// subtree is skipped
    pub parse_error: Option<String>,
    pub subdirs: Vec<Dir>,
}

/// One unit of apply work: a desired schema bound to a live server and
/// schema name. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct Target {
    pub instance: Instance,
    pub dir_path: PathBuf,
    pub schema_name: String,
    pub logical: LogicalSchema,
    /// Desired state, materialized and introspected via a workspace
    pub desired: Schema,
    pub opts: TargetOptions,
}

/// Targets partitioned by instance; one group is applied sequentially.
#[derive(Debug)]
pub struct TargetGroup {
    pub instance: Instance,
    pub targets: Vec<Target>,
}

/// Expand a directory (and its subtree, up to `max_depth` levels down)
/// into targets. Returns the targets plus the number of skipped
/// (dir × instance × schema) units.
pub async fn targets_for_dir(dir: &Dir, max_depth: usize) -> (Vec<Target>, usize) {
    let mut targets = Vec::new();
    let mut skip_count = 0usize;

    if let Some(parse_error) = &dir.parse_error {
        tracing::warn!(
            dir = %dir.path.display(),
            error = %parse_error,
            "skipping directory with parse error"
        );
        skip_count += 1;
    } else if dir.config.has_host() && dir.config.schema.is_some() {
        expand_mapped_dir(dir, &mut targets, &mut skip_count).await;
    } else if dir.config.has_host() {
        tracing::debug!(
            dir = %dir.path.display(),
            "directory configures a host but no schema; add a schema mapping to include it"
        );
    } else if dir.config.schema.is_some() {
        tracing::debug!(
            dir = %dir.path.display(),
            "directory configures a schema but no host; add a host mapping to include it"
        );
    }

    if max_depth >= 1 {
        for subdir in &dir.subdirs {
            let (sub_targets, sub_skips) = Box::pin(targets_for_dir(subdir, max_depth - 1)).await;
            targets.extend(sub_targets);
            skip_count += sub_skips;
        }
    }

    (targets, skip_count)
}

/// Partition targets by instance identity, one group per instance.
/// Group order is deterministic; target order within a group follows the
/// input.
pub fn target_groups(targets: Vec<Target>) -> Vec<TargetGroup> {
    let mut groups: Vec<TargetGroup> = Vec::new();
    for target in targets {
        match groups.iter_mut().find(|g| g.instance == target.instance) {
            Some(group) => group.targets.push(target),
            None => groups.push(TargetGroup {
                instance: target.instance.clone(),
                targets: vec![target],
            }),
        }
    }
    groups.sort_by_key(|g| g.instance.id());
    groups
}

async fn expand_mapped_dir(dir: &Dir, targets: &mut Vec<Target>, skip_count: &mut usize) {
    let schema_count = dir.logical_schemas.len();
    let (instances, failed_instances) = resolve_instances(&dir.config).await;
    *skip_count += failed_instances * schema_count;
    if instances.is_empty() {
        return;
    }

    // All servers in one operation must agree on name-case handling;
    // otherwise one desired state cannot map onto all of them.
    let mut probed = Vec::with_capacity(instances.len());
    let mut modes = HashSet::new();
    for instance in instances {
        match instance.name_case().await {
            Ok(mode) => {
                modes.insert(mode.is_insensitive());
                probed.push(instance);
            }
            Err(err) => {
                tracing::warn!(instance = %instance, error = %err, "cannot probe name-case mode");
                *skip_count += schema_count;
            }
        }
    }
    let instances = probed;
    if instances.is_empty() {
        return;
    }
    if modes.len() > 1 {
        tracing::warn!(
            dir = %dir.path.display(),
            "instances mix lower_case_table_names settings; skipping directory"
        );
        *skip_count += instances.len() * schema_count;
        return;
    }

    for logical in &dir.logical_schemas {
        let schema_name = match (&logical.name, &dir.config.schema) {
            (Some(named), Some(configured)) if named != configured => {
                tracing::warn!(
                    dir = %dir.path.display(),
                    named = %named,
                    configured = %configured,
                    "conflicting schema name configuration; skipping schema"
                );
                *skip_count += instances.len();
                continue;
            }
            (Some(named), _) => named.clone(),
            (None, Some(configured)) => configured.clone(),
            (None, None) => continue,
        };

        if let Err(err) = logical.check_name_consistency() {
            tracing::warn!(dir = %dir.path.display(), error = %err, "skipping schema");
            *skip_count += instances.len();
            continue;
        }

        // Materialize the desired state once per logical schema; every
        // instance in the group shares the result.
        let mut workspace_opts = dir.options.workspace.clone();
        if workspace_opts.workspace_type == WorkspaceType::TempSchema
            && workspace_opts.instance.is_none()
        {
            workspace_opts.instance = Some(instances[0].clone());
        }
        let exec_result = match exec_logical_schema(&workspace_opts, logical).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(
                    dir = %dir.path.display(),
                    schema = %schema_name,
                    error = %err,
                    "cannot materialize desired state; skipping schema"
                );
                *skip_count += instances.len();
                continue;
            }
        };
        if !exec_result.failures.is_empty() {
            for failure in &exec_result.failures {
                tracing::error!(
                    statement = %failure.statement,
                    error = %failure.message,
                    "desired-state statement failed"
                );
            }
            *skip_count += instances.len();
            continue;
        }

        let mut desired = exec_result.schema.schema;
        desired.name = schema_name.clone();

        for instance in &instances {
            targets.push(Target {
                instance: instance.clone(),
                dir_path: dir.path.clone(),
                schema_name: schema_name.clone(),
                logical: logical.clone(),
                desired: desired.clone(),
                opts: dir.options.clone(),
            });
        }
    }
}

/// Resolve the configured hosts into connectable instances. The second
/// element counts instances that failed connectivity or flavor probing
/// (always 0 or 1 under first-only).
async fn resolve_instances(config: &DirConfig) -> (Vec<Instance>, usize) {
    let mut instances = Vec::new();
    let mut failed = 0usize;

    for host_spec in &config.hosts {
        let instance = config.instance_for(host_spec);
        if let Err(err) = instance.can_connect().await {
            tracing::warn!(instance = %instance, error = %err, "cannot connect");
            if !config.first_only {
                failed += 1;
            }
            continue;
        }
        match instance.flavor().await {
            Ok(flavor) => {
                if let Some(expected) = &config.flavor
                    && expected.vendor != flavor.vendor
                {
                    tracing::warn!(
                        instance = %instance,
                        expected = %expected,
                        actual = %flavor,
                        "server flavor differs from configuration"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(instance = %instance, error = %err, "cannot detect flavor");
                if !config.first_only {
                    failed += 1;
                }
                continue;
            }
        }
        instances.push(instance);
        if config.first_only {
            break;
        }
    }

    if config.first_only && instances.is_empty() && !config.hosts.is_empty() {
        failed = 1;
    }
    (instances, failed)
}

#[cfg(test)]
mod tests;
