//! Integration tests for workspace materialization
//!
//! These tests need a live MySQL server. Point SQLDRIFT_TEST_HOST (and
//! optionally SQLDRIFT_TEST_PORT / SQLDRIFT_TEST_USER /
//! SQLDRIFT_TEST_PASSWORD) at one and run `cargo test -- --ignored`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use sqldrift_core::{Instance, LogicalSchema, ObjectKey, ObjectType, Statement};
use sqldrift_workspace::{TempSchemaMode, WorkspaceOpts, WorkspaceType, exec_logical_schema};

fn test_instance() -> Result<Instance> {
    let host = std::env::var("SQLDRIFT_TEST_HOST").context("SQLDRIFT_TEST_HOST not set")?;
    let port = std::env::var("SQLDRIFT_TEST_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3306);
    let user = std::env::var("SQLDRIFT_TEST_USER").unwrap_or_else(|_| "root".to_string());
    let password = std::env::var("SQLDRIFT_TEST_PASSWORD").ok();
    Ok(Instance::new(host, port, user, password))
}

fn test_opts(instance: Instance, schema_name: &str, mode: TempSchemaMode) -> WorkspaceOpts {
    WorkspaceOpts {
        workspace_type: WorkspaceType::TempSchema,
        instance: Some(instance),
        schema_name: schema_name.to_string(),
        mode,
        ..WorkspaceOpts::default()
    }
}

fn create_statement(object_type: ObjectType, name: &str, text: &str) -> Statement {
    Statement {
        text: text.to_string(),
        file: PathBuf::from(format!("{name}.sql")),
        line_no: 1,
        object_type,
        object_name: name.to_string(),
        schema_qualifier: None,
        compound: object_type.is_stored_program(),
    }
}

#[tokio::test]
#[ignore = "needs a live MySQL server"]
async fn test_populate_returns_exact_object_count() -> Result<()> {
    let mut logical = LogicalSchema::new(None);
    for name in ["users", "posts", "tags"] {
        logical.add_create(create_statement(
            ObjectType::Table,
            name,
            &format!("CREATE TABLE `{name}` (`id` int unsigned NOT NULL, PRIMARY KEY (`id`))"),
        ));
    }
    logical.add_create(create_statement(
        ObjectType::Procedure,
        "touch_nothing",
        "CREATE PROCEDURE `touch_nothing`() BEGIN SELECT 1; END",
    ));

    let opts = test_opts(test_instance()?, "_sqldrift_test_count", TempSchemaMode::Regular);
    let result = exec_logical_schema(&opts, &logical).await?;

    assert!(result.failures.is_empty(), "failures: {:?}", result.failures);
    assert_eq!(result.schema.schema.object_count(), 4);
    assert!(result.schema.schema.table("users").is_some());
    assert!(
        result
            .schema
            .schema
            .contains(&ObjectKey::new(ObjectType::Procedure, "touch_nothing"))
    );
    Ok(())
}

#[tokio::test]
#[ignore = "needs a live MySQL server"]
async fn test_create_like_out_of_order_is_retried() -> Result<()> {
    // `a_copy` sorts before `z_source`, so it is submitted first and
    // fails with a missing-object error on the first pass. The
    // sequential retry must bring both tables up.
    let mut logical = LogicalSchema::new(None);
    logical.add_create(create_statement(
        ObjectType::Table,
        "a_copy",
        "CREATE TABLE `a_copy` LIKE `z_source`",
    ));
    logical.add_create(create_statement(
        ObjectType::Table,
        "z_source",
        "CREATE TABLE `z_source` (`id` int NOT NULL, PRIMARY KEY (`id`))",
    ));

    let opts = test_opts(test_instance()?, "_sqldrift_test_like", TempSchemaMode::Serial);
    let result = exec_logical_schema(&opts, &logical).await?;

    assert!(result.failures.is_empty(), "failures: {:?}", result.failures);
    assert!(result.schema.schema.table("a_copy").is_some());
    assert!(result.schema.schema.table("z_source").is_some());
    Ok(())
}

#[tokio::test]
#[ignore = "needs a live MySQL server"]
async fn test_compound_routine_body_cannot_leak_statements() -> Result<()> {
    // The body's inner DROP DATABASE must stay inside the stored program.
    // If it leaked out through multi-statement execution the schema would
    // vanish mid-populate and the executor would fail introspection or
    // the object-count check.
    let mut logical = LogicalSchema::new(None);
    logical.add_create(create_statement(
        ObjectType::Table,
        "victim",
        "CREATE TABLE `victim` (`id` int NOT NULL, PRIMARY KEY (`id`))",
    ));
    logical.add_create(create_statement(
        ObjectType::Procedure,
        "sneaky",
        "CREATE PROCEDURE `sneaky`() BEGIN SELECT 1; DROP DATABASE `_sqldrift_test_sneaky`; END",
    ));

    let opts = test_opts(test_instance()?, "_sqldrift_test_sneaky", TempSchemaMode::Heavy);
    let result = exec_logical_schema(&opts, &logical).await?;

    assert!(result.failures.is_empty(), "failures: {:?}", result.failures);
    assert_eq!(result.schema.schema.object_count(), 2);
    Ok(())
}

#[tokio::test]
#[ignore = "needs a live MySQL server"]
async fn test_cyclic_foreign_keys_populate_under_concurrency() -> Result<()> {
    // Six tables referencing each other in a cycle. On MySQL 8+ the
    // parallel CREATEs deadlock through FK metadata locks and must be
    // recovered by the sequential retry pass.
    let names = ["fk_a", "fk_b", "fk_c", "fk_d", "fk_e", "fk_f"];
    let mut logical = LogicalSchema::new(None);
    for (i, name) in names.iter().enumerate() {
        let target = names[(i + 1) % names.len()];
        logical.add_create(create_statement(
            ObjectType::Table,
            name,
            &format!(
                "CREATE TABLE `{name}` (\
                 `id` int unsigned NOT NULL, \
                 `other_id` int unsigned DEFAULT NULL, \
                 PRIMARY KEY (`id`), \
                 KEY `idx_other` (`other_id`), \
                 CONSTRAINT `fk_{name}` FOREIGN KEY (`other_id`) REFERENCES `{target}` (`id`))"
            ),
        ));
    }

    for mode in [TempSchemaMode::Light, TempSchemaMode::Heavy, TempSchemaMode::Extreme] {
        let opts = test_opts(test_instance()?, "_sqldrift_test_cycle", mode);
        let result = exec_logical_schema(&opts, &logical).await?;
        assert!(result.failures.is_empty(), "failures: {:?}", result.failures);
        assert_eq!(result.schema.schema.object_count(), 6);
        for name in names {
            assert!(result.schema.schema.table(name).is_some());
        }
    }
    Ok(())
}

#[tokio::test]
#[ignore = "needs a live MySQL server"]
async fn test_reused_schema_survives_cleanup() -> Result<()> {
    let mut logical = LogicalSchema::new(None);
    logical.add_create(create_statement(
        ObjectType::Table,
        "keepme",
        "CREATE TABLE `keepme` (`id` int NOT NULL, PRIMARY KEY (`id`))",
    ));

    let instance = test_instance()?;
    let mut opts = test_opts(instance.clone(), "_sqldrift_test_reuse", TempSchemaMode::Regular);
    opts.reuse_temp_schema = true;

    exec_logical_schema(&opts, &logical).await?;
    assert!(instance.schema_exists("_sqldrift_test_reuse").await?);
    assert!(instance.table_names("_sqldrift_test_reuse").await?.is_empty());

    // Without reuse the whole schema goes away.
    opts.reuse_temp_schema = false;
    exec_logical_schema(&opts, &logical).await?;
    assert!(!instance.schema_exists("_sqldrift_test_reuse").await?);
    Ok(())
}
