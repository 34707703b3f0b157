//! Tests for planner accounting that need no live server

use std::path::PathBuf;

use sqldrift_core::{Instance, LogicalSchema, Schema};

use super::*;

fn empty_dir(path: &str) -> Dir {
    Dir {
        path: PathBuf::from(path),
        ..Dir::default()
    }
}

fn fake_target(host: &str, schema_name: &str) -> Target {
    Target {
        instance: Instance::new(host, 3306, "root", None),
        dir_path: PathBuf::from("/schemas"),
        schema_name: schema_name.to_string(),
        logical: LogicalSchema::new(None),
        desired: Schema::default(),
        opts: TargetOptions::default(),
    }
}

#[tokio::test]
async fn test_parse_error_counts_one_skip() {
    let mut dir = empty_dir("/schemas/broken");
    dir.parse_error = Some("syntax error in users.sql".to_string());
    let (targets, skips) = targets_for_dir(&dir, 5).await;
    assert!(targets.is_empty());
    assert_eq!(skips, 1);
}

#[tokio::test]
async fn test_unmapped_dirs_skip_silently() {
    // Schema without host: advisory log only, no skip counted
    let mut dir = empty_dir("/schemas/schema-only");
    dir.config.schema = Some("app".to_string());
    let (targets, skips) = targets_for_dir(&dir, 5).await;
    assert!(targets.is_empty());
    assert_eq!(skips, 0);

    // Host without schema: same
    let mut dir = empty_dir("/schemas/host-only");
    dir.config.hosts = vec!["db1".to_string()];
    let (targets, skips) = targets_for_dir(&dir, 5).await;
    assert!(targets.is_empty());
    assert_eq!(skips, 0);
}

#[tokio::test]
async fn test_recursion_depth_limits() {
    let mut leaf = empty_dir("/schemas/a/b");
    leaf.parse_error = Some("broken".to_string());
    let mut mid = empty_dir("/schemas/a");
    mid.subdirs.push(leaf);
    let mut root = empty_dir("/schemas");
    root.subdirs.push(mid);

    // Depth 2 reaches the leaf
    let (_, skips) = targets_for_dir(&root, 2).await;
    assert_eq!(skips, 1);

    // Depth 1 stops at the middle layer
    let (_, skips) = targets_for_dir(&root, 1).await;
    assert_eq!(skips, 0);

    // Depth 0 never recurses
    let (_, skips) = targets_for_dir(&root, 0).await;
    assert_eq!(skips, 0);
}

#[tokio::test]
async fn test_skip_counts_are_additive_across_subtrees() {
    let mut root = empty_dir("/schemas");
    for name in ["x", "y", "z"] {
        let mut sub = empty_dir(&format!("/schemas/{name}"));
        sub.parse_error = Some("broken".to_string());
        root.subdirs.push(sub);
    }
    let (_, skips) = targets_for_dir(&root, 1).await;
    assert_eq!(skips, 3);
}

#[test]
fn test_target_groups_partition_by_instance() {
    let targets = vec![
        fake_target("db1", "app"),
        fake_target("db2", "app"),
        fake_target("db1", "analytics"),
    ];
    let groups = target_groups(targets);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].instance.id(), "db1:3306");
    assert_eq!(groups[0].targets.len(), 2);
    assert_eq!(groups[1].instance.id(), "db2:3306");
    assert_eq!(groups[1].targets.len(), 1);
}

#[test]
fn test_host_spec_port_parsing() {
    let config = DirConfig {
        hosts: vec!["db1".to_string(), "db2:3307".to_string()],
        ..DirConfig::default()
    };
    let plain = config.instance_for(&config.hosts[0]);
    assert_eq!(plain.id(), "db1:3306");
    let with_port = config.instance_for(&config.hosts[1]);
    assert_eq!(with_port.id(), "db2:3307");
}
