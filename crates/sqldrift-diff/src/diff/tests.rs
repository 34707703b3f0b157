//! Tests for schema diffing and statement generation

use sqldrift_core::{
    Column, ForeignKey, Index, IndexPart, ObjectKey, ObjectType, Routine, Schema, Table,
};

use super::*;
use crate::modifiers::{NextAutoInc, PartitioningMode, StatementModifiers};

fn create_test_column(name: &str, type_definition: &str) -> Column {
    Column {
        name: name.to_string(),
        type_definition: type_definition.to_string(),
        nullable: false,
        default: None,
        auto_increment: false,
        charset: None,
        collation: None,
        generation_expression: None,
        on_update: None,
        comment: None,
    }
}

fn create_test_table(name: &str, columns: Vec<Column>) -> Table {
    Table {
        name: name.to_string(),
        columns,
        indexes: vec![Index {
            name: "PRIMARY".to_string(),
            parts: vec![IndexPart {
                column: "id".to_string(),
                sub_part: None,
            }],
            unique: true,
            index_type: "BTREE".to_string(),
            comment: None,
        }],
        foreign_keys: Vec::new(),
        checks: Vec::new(),
        engine: "InnoDB".to_string(),
        charset: "utf8mb4".to_string(),
        collation: "utf8mb4_general_ci".to_string(),
        row_format: None,
        partitioning: None,
        next_auto_increment: None,
        comment: None,
        create_statement: format!("CREATE TABLE `{name}` (...)"),
    }
}

fn create_test_schema(name: &str, tables: Vec<Table>) -> Schema {
    Schema {
        name: name.to_string(),
        charset: "utf8mb4".to_string(),
        collation: "utf8mb4_general_ci".to_string(),
        tables,
        routines: Vec::new(),
    }
}

fn create_test_routine(name: &str, body: &str) -> Routine {
    Routine {
        name: name.to_string(),
        object_type: ObjectType::Procedure,
        definer: "root@%".to_string(),
        param_list: String::new(),
        returns: None,
        body: body.to_string(),
        sql_mode: "STRICT_TRANS_TABLES".to_string(),
        security_type: "DEFINER".to_string(),
        comment: None,
        create_statement: format!("CREATE PROCEDURE `{name}`()\n{body}"),
    }
}

#[test]
fn test_identical_schemas_produce_empty_diff() {
    let table = create_test_table(
        "users",
        vec![
            create_test_column("id", "int"),
            create_test_column("name", "varchar(40)"),
        ],
    );
    let from = create_test_schema("live", vec![table.clone()]);
    let to = create_test_schema("desired", vec![table]);
    assert!(diff_schemas(&from, &to).is_empty());
}

#[test]
fn test_widened_column_is_safe_modify() {
    let from_table = create_test_table(
        "t",
        vec![
            create_test_column("id", "int"),
            create_test_column("name", "varchar(30)"),
        ],
    );
    let to_table = create_test_table(
        "t",
        vec![
            create_test_column("id", "int"),
            create_test_column("name", "varchar(40)"),
        ],
    );
    let diff = diff_schemas(
        &create_test_schema("live", vec![from_table]),
        &create_test_schema("desired", vec![to_table]),
    );
    assert_eq!(diff.len(), 1);
    let sql = diff.object_diffs()[0]
        .statement(&StatementModifiers::new())
        .unwrap();
    assert_eq!(
        sql,
        "ALTER TABLE `t` MODIFY COLUMN `name` varchar(40) NOT NULL"
    );
}

#[test]
fn test_narrowed_column_is_unsafe_but_carries_sql() {
    let from_table = create_test_table("t", vec![create_test_column("name", "varchar(40)")]);
    let to_table = create_test_table("t", vec![create_test_column("name", "varchar(30)")]);
    let diff = diff_schemas(
        &create_test_schema("live", vec![from_table]),
        &create_test_schema("desired", vec![to_table]),
    );

    let err = diff.object_diffs()[0]
        .statement(&StatementModifiers::new())
        .unwrap_err();
    match &err {
        StatementError::Unsafe { sql, .. } => {
            assert!(sql.contains("MODIFY COLUMN `name` varchar(30)"));
        }
        other => panic!("expected unsafe error, got {other:?}"),
    }

    let mods = StatementModifiers {
        allow_unsafe: true,
        ..StatementModifiers::new()
    };
    assert!(diff.object_diffs()[0].statement(&mods).is_ok());
}

#[test]
fn test_dropped_table_is_unsafe() {
    let from = create_test_schema(
        "live",
        vec![create_test_table("u", vec![create_test_column("id", "int")])],
    );
    let to = create_test_schema("desired", Vec::new());
    let diff = diff_schemas(&from, &to);
    assert_eq!(diff.len(), 1);
    assert_eq!(diff.object_diffs()[0].diff_type, DiffType::Drop);

    let err = diff.object_diffs()[0]
        .statement(&StatementModifiers::new())
        .unwrap_err();
    assert!(matches!(err, StatementError::Unsafe { .. }));
    assert_eq!(err.sql(), Some("DROP TABLE `u`"));
}

#[test]
fn test_added_column_position_and_lax_order() {
    let from_table = create_test_table(
        "t",
        vec![
            create_test_column("id", "int"),
            create_test_column("z", "int"),
        ],
    );
    let to_table = create_test_table(
        "t",
        vec![
            create_test_column("id", "int"),
            create_test_column("mid", "int"),
            create_test_column("z", "int"),
        ],
    );
    let diff = diff_schemas(
        &create_test_schema("live", vec![from_table]),
        &create_test_schema("desired", vec![to_table]),
    );

    let sql = diff.object_diffs()[0]
        .statement(&StatementModifiers::new())
        .unwrap();
    assert!(sql.contains("ADD COLUMN `mid` int NOT NULL AFTER `id`"));

    let mods = StatementModifiers {
        lax_column_order: true,
        ..StatementModifiers::new()
    };
    let sql = diff.object_diffs()[0].statement(&mods).unwrap();
    assert!(sql.contains("ADD COLUMN `mid` int NOT NULL"));
    assert!(!sql.contains("AFTER"));
}

#[test]
fn test_reordered_columns_emit_position_modify() {
    let from_table = create_test_table(
        "t",
        vec![
            create_test_column("id", "int"),
            create_test_column("a", "int"),
            create_test_column("b", "int"),
        ],
    );
    let to_table = create_test_table(
        "t",
        vec![
            create_test_column("id", "int"),
            create_test_column("b", "int"),
            create_test_column("a", "int"),
        ],
    );
    let diff = diff_schemas(
        &create_test_schema("live", vec![from_table]),
        &create_test_schema("desired", vec![to_table]),
    );
    let sql = diff.object_diffs()[0]
        .statement(&StatementModifiers::new())
        .unwrap();
    assert!(sql.contains("MODIFY COLUMN `b` int NOT NULL AFTER `id`"));

    let mods = StatementModifiers {
        lax_column_order: true,
        ..StatementModifiers::new()
    };
    assert_eq!(diff.object_diffs()[0].statement(&mods).unwrap(), "");
}

#[test]
fn test_non_innodb_structural_change_is_unsupported() {
    let mut from_table = create_test_table("t", vec![create_test_column("id", "int")]);
    from_table.engine = "MyISAM".to_string();
    let mut to_table = create_test_table(
        "t",
        vec![
            create_test_column("id", "int"),
            create_test_column("extra", "int"),
        ],
    );
    to_table.engine = "MyISAM".to_string();

    let diff = diff_schemas(
        &create_test_schema("live", vec![from_table]),
        &create_test_schema("desired", vec![to_table]),
    );
    let err = diff.object_diffs()[0]
        .statement(&StatementModifiers::new())
        .unwrap_err();
    match err {
        StatementError::Unsupported { sql, .. } => {
            assert!(sql.contains("ADD COLUMN `extra`"));
        }
        other => panic!("expected unsupported error, got {other:?}"),
    }
}

#[test]
fn test_auto_increment_modes() {
    let mut from_table = create_test_table("t", vec![create_test_column("id", "int")]);
    from_table.next_auto_increment = Some(100);
    let mut to_table = from_table.clone();
    to_table.next_auto_increment = Some(50);

    let diff = diff_schemas(
        &create_test_schema("live", vec![from_table.clone()]),
        &create_test_schema("desired", vec![to_table.clone()]),
    );

    // Ignore: decreasing value produces no diffable change at all
    assert_eq!(
        diff.object_diffs()[0]
            .statement(&StatementModifiers::new())
            .unwrap(),
        ""
    );

    // IfIncreased: still nothing, value went down
    let mods = StatementModifiers {
        next_auto_inc: NextAutoInc::IfIncreased,
        ..StatementModifiers::new()
    };
    assert_eq!(diff.object_diffs()[0].statement(&mods).unwrap(), "");

    // Always: emitted
    let mods = StatementModifiers {
        next_auto_inc: NextAutoInc::Always,
        ..StatementModifiers::new()
    };
    assert_eq!(
        diff.object_diffs()[0].statement(&mods).unwrap(),
        "ALTER TABLE `t` AUTO_INCREMENT=50"
    );
}

#[test]
fn test_partitioning_modes() {
    let mut from_table = create_test_table("t", vec![create_test_column("id", "int")]);
    from_table.partitioning = Some("PARTITION BY HASH (`id`) PARTITIONS 4".to_string());
    let to_table = create_test_table("t", vec![create_test_column("id", "int")]);

    let diff = diff_schemas(
        &create_test_schema("live", vec![from_table]),
        &create_test_schema("desired", vec![to_table]),
    );

    let sql = diff.object_diffs()[0]
        .statement(&StatementModifiers::new())
        .unwrap();
    assert_eq!(sql, "ALTER TABLE `t` REMOVE PARTITIONING");

    let mods = StatementModifiers {
        partitioning: PartitioningMode::Permissive,
        ..StatementModifiers::new()
    };
    assert_eq!(diff.object_diffs()[0].statement(&mods).unwrap(), "");
}

#[test]
fn test_modified_index_is_dropped_and_readded() {
    let mut from_table = create_test_table("t", vec![create_test_column("id", "int")]);
    from_table.indexes.push(Index {
        name: "idx_a".to_string(),
        parts: vec![IndexPart {
            column: "id".to_string(),
            sub_part: None,
        }],
        unique: false,
        index_type: "BTREE".to_string(),
        comment: None,
    });
    let mut to_table = create_test_table("t", vec![create_test_column("id", "int")]);
    to_table.indexes.push(Index {
        name: "idx_a".to_string(),
        parts: vec![IndexPart {
            column: "id".to_string(),
            sub_part: None,
        }],
        unique: true,
        index_type: "BTREE".to_string(),
        comment: None,
    });

    let diff = diff_schemas(
        &create_test_schema("live", vec![from_table]),
        &create_test_schema("desired", vec![to_table]),
    );
    let sql = diff.object_diffs()[0]
        .statement(&StatementModifiers::new())
        .unwrap();
    assert_eq!(
        sql,
        "ALTER TABLE `t` DROP KEY `idx_a`, ADD UNIQUE KEY `idx_a` (`id`)"
    );
}

#[test]
fn test_modified_foreign_key_emits_pre_drop() {
    let fk = |delete_rule: &str| ForeignKey {
        name: "fk_user".to_string(),
        columns: vec!["user_id".to_string()],
        referenced_schema: None,
        referenced_table: "users".to_string(),
        referenced_columns: vec!["id".to_string()],
        update_rule: "RESTRICT".to_string(),
        delete_rule: delete_rule.to_string(),
    };
    let mut from_table = create_test_table(
        "posts",
        vec![
            create_test_column("id", "int"),
            create_test_column("user_id", "int"),
        ],
    );
    from_table.foreign_keys.push(fk("RESTRICT"));
    let mut to_table = from_table.clone();
    to_table.foreign_keys = vec![fk("CASCADE")];

    let diff = diff_schemas(
        &create_test_schema("live", vec![from_table]),
        &create_test_schema("desired", vec![to_table]),
    );
    assert_eq!(diff.len(), 2);
    assert_eq!(diff.object_diffs()[0].subtype, DiffSubtype::FkPreDrop);

    let mods = StatementModifiers::new();
    assert_eq!(
        diff.object_diffs()[0].statement(&mods).unwrap(),
        "ALTER TABLE `posts` DROP FOREIGN KEY `fk_user`"
    );
    let main = diff.object_diffs()[1].statement(&mods).unwrap();
    assert!(main.contains("ADD CONSTRAINT `fk_user` FOREIGN KEY"));
    assert!(!main.contains("DROP FOREIGN KEY"));

    // Under skip-pre-drop the early ALTER vanishes and the drop folds
    // into the main statement.
    let mods = StatementModifiers {
        skip_pre_drop_alters: true,
        ..StatementModifiers::new()
    };
    assert_eq!(diff.object_diffs()[0].statement(&mods).unwrap(), "");
    let main = diff.object_diffs()[1].statement(&mods).unwrap();
    assert!(main.contains("DROP FOREIGN KEY `fk_user`"));
}

#[test]
fn test_changed_routine_becomes_drop_create_pair() {
    let mut from = create_test_schema("live", Vec::new());
    from.routines.push(create_test_routine("cleanup", "BEGIN SELECT 1; END"));
    let mut to = create_test_schema("desired", Vec::new());
    to.routines.push(create_test_routine("cleanup", "BEGIN SELECT 2; END"));

    let diff = diff_schemas(&from, &to);
    assert_eq!(diff.len(), 2);
    assert_eq!(diff.object_diffs()[0].diff_type, DiffType::Drop);
    assert_eq!(diff.object_diffs()[1].diff_type, DiffType::Create);

    let mods = StatementModifiers::new();
    assert_eq!(
        diff.object_diffs()[0].statement(&mods).unwrap(),
        "DROP PROCEDURE `cleanup`"
    );
    assert!(
        diff.object_diffs()[1]
            .statement(&mods)
            .unwrap()
            .contains("CREATE PROCEDURE `cleanup`")
    );
}

#[test]
fn test_metadata_only_routine_change_requires_compare_metadata() {
    let mut from = create_test_schema("live", Vec::new());
    from.routines.push(create_test_routine("cleanup", "BEGIN END"));
    let mut to = create_test_schema("desired", Vec::new());
    let mut changed = create_test_routine("cleanup", "BEGIN END");
    changed.definer = "admin@%".to_string();
    to.routines.push(changed);

    let diff = diff_schemas(&from, &to);
    assert_eq!(diff.len(), 2);
    assert!(diff.object_diffs().iter().all(|d| d.subtype == DiffSubtype::RoutineMetadata));

    let mods = StatementModifiers::new();
    assert!(diff.object_diffs().iter().all(|d| d.statement(&mods).unwrap().is_empty()));

    let mods = StatementModifiers {
        compare_metadata: true,
        ..StatementModifiers::new()
    };
    assert_eq!(
        diff.object_diffs()[0].statement(&mods).unwrap(),
        "DROP PROCEDURE `cleanup`"
    );
}

#[test]
fn test_table_alters_accessor_skips_pre_drops() {
    let mut from_table = create_test_table("t", vec![create_test_column("id", "int")]);
    from_table.foreign_keys.push(ForeignKey {
        name: "fk".to_string(),
        columns: vec!["id".to_string()],
        referenced_schema: None,
        referenced_table: "other".to_string(),
        referenced_columns: vec!["id".to_string()],
        update_rule: "RESTRICT".to_string(),
        delete_rule: "RESTRICT".to_string(),
    });
    let mut to_table = from_table.clone();
    to_table.foreign_keys[0].delete_rule = "CASCADE".to_string();

    let diff = diff_schemas(
        &create_test_schema("live", vec![from_table]),
        &create_test_schema("desired", vec![to_table]),
    );
    assert_eq!(diff.len(), 2);
    assert_eq!(diff.table_alters().count(), 1);
    assert_eq!(
        diff.table_alters().next().map(|d| d.key.clone()),
        Some(ObjectKey::table("t"))
    );
}
