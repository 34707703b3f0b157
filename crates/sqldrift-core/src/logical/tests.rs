//! Tests for desired-state bundles

use std::path::PathBuf;

use super::*;

fn create_test_statement(object_type: ObjectType, name: &str, compound: bool) -> Statement {
    Statement {
        text: format!("CREATE {} `{}` ...", object_type.keyword(), name),
        file: PathBuf::from(format!("{name}.sql")),
        line_no: 1,
        object_type,
        object_name: name.to_string(),
        schema_qualifier: None,
        compound,
    }
}

#[test]
fn test_add_create_detects_duplicates() {
    let mut logical = LogicalSchema::new(None);
    assert!(
        logical
            .add_create(create_test_statement(ObjectType::Table, "users", false))
            .is_none()
    );
    assert!(
        logical
            .add_create(create_test_statement(ObjectType::Table, "users", false))
            .is_some()
    );
    assert_eq!(logical.len(), 1);
}

#[test]
fn test_chunkable_split() {
    let mut logical = LogicalSchema::new(None);
    logical.add_create(create_test_statement(ObjectType::Table, "users", false));
    logical.add_create(create_test_statement(ObjectType::Table, "posts", false));
    logical.add_create(create_test_statement(ObjectType::Procedure, "cleanup", true));

    let chunkable: Vec<_> = logical.chunkable_creates().collect();
    let non_chunkable: Vec<_> = logical.non_chunkable_creates().collect();
    assert_eq!(chunkable.len(), 2);
    assert_eq!(non_chunkable.len(), 1);
    assert_eq!(non_chunkable[0].object_name, "cleanup");
}

#[test]
fn test_name_consistency_unnamed_with_qualifier() {
    let mut logical = LogicalSchema::new(None);
    let mut statement = create_test_statement(ObjectType::Table, "users", false);
    statement.schema_qualifier = Some("prod".to_string());
    logical.add_create(statement);
    assert!(logical.check_name_consistency().is_err());
}

#[test]
fn test_name_consistency_matching_qualifier() {
    let mut logical = LogicalSchema::new(Some("prod".to_string()));
    let mut statement = create_test_statement(ObjectType::Table, "users", false);
    statement.schema_qualifier = Some("prod".to_string());
    logical.add_create(statement);
    logical.add_create(create_test_statement(ObjectType::Table, "posts", false));
    assert!(logical.check_name_consistency().is_ok());
}

#[test]
fn test_name_consistency_conflicting_qualifier() {
    let mut logical = LogicalSchema::new(Some("prod".to_string()));
    let mut statement = create_test_statement(ObjectType::Table, "users", false);
    statement.schema_qualifier = Some("staging".to_string());
    logical.add_create(statement);
    assert!(logical.check_name_consistency().is_err());
}
