//! Tests for the desired-state file loader

use super::*;

#[test]
fn test_split_plain_statements() {
    let content = "-- users\nCREATE TABLE `users` (\n  `id` int NOT NULL\n);\n\nCREATE TABLE `posts` (`id` int NOT NULL);\n";
    let statements = split_statements(content);
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].0, 2);
    assert!(statements[0].1.starts_with("CREATE TABLE `users`"));
    assert!(!statements[0].1.ends_with(';'));
    assert_eq!(statements[1].0, 6);
}

#[test]
fn test_routine_consumes_rest_of_file() {
    let content = "CREATE PROCEDURE `p`()\nBEGIN\n  SELECT 1;\n  SELECT 2;\nEND;\n";
    let statements = split_statements(content);
    assert_eq!(statements.len(), 1);
    assert!(statements[0].1.contains("SELECT 2"));
    assert!(statements[0].1.ends_with("END"));
}

#[test]
fn test_parse_statement_headers() {
    let ((object_type, name, qualifier, is_alter), _) =
        parse_statement_header("CREATE TABLE `users` (`id` int)").unwrap();
    assert_eq!(object_type, ObjectType::Table);
    assert_eq!(name, "users");
    assert_eq!(qualifier, None);
    assert!(!is_alter);

    let ((object_type, name, qualifier, _), token) =
        parse_statement_header("CREATE TABLE `prod`.`users` (`id` int)").unwrap();
    assert_eq!(object_type, ObjectType::Table);
    assert_eq!(name, "users");
    assert_eq!(qualifier.as_deref(), Some("prod"));
    assert_eq!(token, "`prod`.`users`");

    let ((object_type, name, _, is_alter), _) =
        parse_statement_header("ALTER TABLE users ADD KEY `k` (`id`)").unwrap();
    assert_eq!(object_type, ObjectType::Table);
    assert_eq!(name, "users");
    assert!(is_alter);

    let ((object_type, name, _, _), token) =
        parse_statement_header("CREATE FUNCTION f() RETURNS int RETURN 1").unwrap();
    assert_eq!(object_type, ObjectType::Function);
    assert_eq!(name, "f");
    assert_eq!(token, "f");
}

#[test]
fn test_qualified_names_are_stripped_from_text() {
    let mut logical = LogicalSchema::new(None);
    parse_sql_file(
        "CREATE TABLE `prod`.`users` (`id` int);\n",
        Path::new("users.sql"),
        &mut logical,
    )
    .unwrap();
    let statement = logical
        .create_for(&sqldrift_core::ObjectKey::table("users"))
        .unwrap();
    assert_eq!(statement.schema_qualifier.as_deref(), Some("prod"));
    assert!(statement.text.starts_with("CREATE TABLE `users`"));
    assert!(!statement.text.contains("`prod`"));
}

#[test]
fn test_unsupported_statements_rejected() {
    assert!(parse_statement_header("DROP TABLE `users`").is_err());
    assert!(parse_statement_header("ALTER PROCEDURE `p` COMMENT 'x'").is_err());
    assert!(parse_statement_header("INSERT INTO t VALUES (1)").is_err());
}

#[test]
fn test_object_name_forms() {
    assert_eq!(parse_object_name("users").unwrap(), (None, "users".to_string()));
    assert_eq!(parse_object_name("users(").unwrap(), (None, "users".to_string()));
    assert_eq!(
        parse_object_name("`weird.name`").unwrap(),
        (None, "weird.name".to_string())
    );
    assert_eq!(
        parse_object_name("db.users").unwrap(),
        (Some("db".to_string()), "users".to_string())
    );
    assert_eq!(
        parse_object_name("`db`.`users`").unwrap(),
        (Some("db".to_string()), "users".to_string())
    );
    assert!(parse_object_name("`unterminated").is_err());
}

#[test]
fn test_duplicate_definition_is_parse_error() {
    let mut logical = LogicalSchema::new(None);
    let content = "CREATE TABLE `t` (`id` int);\nCREATE TABLE `t` (`id` bigint);\n";
    let err = parse_sql_file(content, Path::new("t.sql"), &mut logical).unwrap_err();
    assert!(err.to_string().contains("already defined"));
}
