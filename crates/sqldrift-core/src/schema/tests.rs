//! Tests for the schema object model

use super::*;

fn create_test_column(name: &str, type_definition: &str, nullable: bool) -> Column {
    Column {
        name: name.to_string(),
        type_definition: type_definition.to_string(),
        nullable,
        default: None,
        auto_increment: false,
        charset: None,
        collation: None,
        generation_expression: None,
        on_update: None,
        comment: None,
    }
}

#[test]
fn test_quote_ident_escapes_backticks() {
    assert_eq!(quote_ident("users"), "`users`");
    assert_eq!(quote_ident("weird`name"), "`weird``name`");
}

#[test]
fn test_column_definition_rendering() {
    let mut col = create_test_column("name", "varchar(40)", false);
    assert_eq!(col.definition(), "`name` varchar(40) NOT NULL");

    col.nullable = true;
    col.default = Some("NULL".to_string());
    assert_eq!(col.definition(), "`name` varchar(40) DEFAULT NULL");

    let mut id = create_test_column("id", "int unsigned", false);
    id.auto_increment = true;
    assert_eq!(id.definition(), "`id` int unsigned NOT NULL AUTO_INCREMENT");

    let mut commented = create_test_column("note", "text", true);
    commented.comment = Some("user's note".to_string());
    assert_eq!(
        commented.definition(),
        "`note` text COMMENT 'user''s note'"
    );
    assert_eq!(commented.definition_without_comment(), "`note` text");
}

#[test]
fn test_index_definitions() {
    let pk = Index {
        name: "PRIMARY".to_string(),
        parts: vec![IndexPart {
            column: "id".to_string(),
            sub_part: None,
        }],
        unique: true,
        index_type: "BTREE".to_string(),
        comment: None,
    };
    assert!(pk.is_primary());
    assert_eq!(pk.definition(), "PRIMARY KEY (`id`)");

    let idx = Index {
        name: "idx_name".to_string(),
        parts: vec![IndexPart {
            column: "name".to_string(),
            sub_part: Some(10),
        }],
        unique: false,
        index_type: "BTREE".to_string(),
        comment: None,
    };
    assert_eq!(idx.definition(), "KEY `idx_name` (`name`(10))");

    let uniq = Index {
        name: "uq".to_string(),
        parts: vec![
            IndexPart {
                column: "a".to_string(),
                sub_part: None,
            },
            IndexPart {
                column: "b".to_string(),
                sub_part: None,
            },
        ],
        unique: true,
        index_type: "BTREE".to_string(),
        comment: None,
    };
    assert_eq!(uniq.definition(), "UNIQUE KEY `uq` (`a`, `b`)");
    assert_ne!(uniq.signature(), idx.signature());
}

#[test]
fn test_foreign_key_definition() {
    let fk = ForeignKey {
        name: "fk_user".to_string(),
        columns: vec!["user_id".to_string()],
        referenced_schema: None,
        referenced_table: "users".to_string(),
        referenced_columns: vec!["id".to_string()],
        update_rule: "RESTRICT".to_string(),
        delete_rule: "CASCADE".to_string(),
    };
    assert_eq!(
        fk.definition(),
        "CONSTRAINT `fk_user` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE"
    );
}

#[test]
fn test_strip_auto_inc_clause() {
    let create = "CREATE TABLE `t` (\n  `id` int NOT NULL AUTO_INCREMENT,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB AUTO_INCREMENT=42 DEFAULT CHARSET=utf8mb4";
    let stripped = strip_auto_inc_clause(create);
    assert!(!stripped.contains("AUTO_INCREMENT=42"));
    assert!(stripped.contains("AUTO_INCREMENT,"));
    assert!(stripped.contains("DEFAULT CHARSET=utf8mb4"));

    let unchanged = "CREATE TABLE `t` (`id` int) ENGINE=InnoDB";
    assert_eq!(strip_auto_inc_clause(unchanged), unchanged);
}

#[test]
fn test_schema_lookups_and_counts() {
    let schema = Schema {
        name: "app".to_string(),
        charset: "utf8mb4".to_string(),
        collation: "utf8mb4_general_ci".to_string(),
        tables: vec![Table {
            name: "users".to_string(),
            columns: vec![create_test_column("id", "int", false)],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            checks: Vec::new(),
            engine: "InnoDB".to_string(),
            charset: "utf8mb4".to_string(),
            collation: "utf8mb4_general_ci".to_string(),
            row_format: None,
            partitioning: None,
            next_auto_increment: None,
            comment: None,
            create_statement: String::new(),
        }],
        routines: vec![Routine {
            name: "cleanup".to_string(),
            object_type: ObjectType::Procedure,
            definer: "root@%".to_string(),
            param_list: String::new(),
            returns: None,
            body: "BEGIN END".to_string(),
            sql_mode: String::new(),
            security_type: "DEFINER".to_string(),
            comment: None,
            create_statement: String::new(),
        }],
    };

    assert_eq!(schema.object_count(), 2);
    assert!(schema.contains(&ObjectKey::table("users")));
    assert!(schema.contains(&ObjectKey::new(ObjectType::Procedure, "cleanup")));
    assert!(!schema.contains(&ObjectKey::new(ObjectType::Function, "cleanup")));
    assert_eq!(schema.object_keys().len(), 2);
    assert_eq!(schema.object_keys()[0], ObjectKey::table("users"));
}
