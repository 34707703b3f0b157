//! Tests for statement modifiers

use super::*;

#[test]
fn test_algorithm_clause_parsing() {
    assert_eq!("".parse::<AlgorithmClause>().unwrap(), AlgorithmClause::Unset);
    assert_eq!(
        "inplace".parse::<AlgorithmClause>().unwrap(),
        AlgorithmClause::Inplace
    );
    assert_eq!("copy".parse::<AlgorithmClause>().unwrap(), AlgorithmClause::Copy);
    assert!("online".parse::<AlgorithmClause>().is_err());
}

#[test]
fn test_lock_clause_parsing() {
    assert_eq!("none".parse::<LockClause>().unwrap(), LockClause::None);
    assert_eq!("exclusive".parse::<LockClause>().unwrap(), LockClause::Exclusive);
    assert!("table".parse::<LockClause>().is_err());
    assert_eq!(LockClause::Unset.as_sql(), None);
    assert_eq!(LockClause::Shared.as_sql(), Some("SHARED"));
}

#[test]
fn test_partitioning_mode_parsing() {
    assert_eq!(
        "permissive".parse::<PartitioningMode>().unwrap(),
        PartitioningMode::Permissive
    );
    assert!("drop".parse::<PartitioningMode>().is_err());
}

#[test]
fn test_verification_modifiers_are_strict() {
    let flavor: Flavor = "mysql:8.0".parse().unwrap();
    let mods = StatementModifiers::strict_for_verification(flavor);
    assert!(mods.allow_unsafe);
    assert!(mods.strict_index_order);
    assert!(mods.strict_check_constraints);
    assert!(mods.strict_foreign_key_naming);
    assert!(mods.strict_column_definition);
    assert!(mods.skip_pre_drop_alters);
    assert_eq!(mods.next_auto_inc, NextAutoInc::Always);
    assert_eq!(mods.partitioning, PartitioningMode::Permissive);
    assert_eq!(mods.algorithm_clause, AlgorithmClause::Copy);
}

#[test]
fn test_verification_modifiers_clear_algorithm_on_old_servers() {
    let flavor: Flavor = "mysql:5.5".parse().unwrap();
    let mods = StatementModifiers::strict_for_verification(flavor);
    assert_eq!(mods.algorithm_clause, AlgorithmClause::Unset);
}

#[test]
fn test_reverification_modifiers_relax_column_definition() {
    let flavor: Flavor = "mysql:8.0".parse().unwrap();
    let mods = StatementModifiers::strict_for_reverification(flavor);
    assert!(!mods.strict_column_definition);
    assert_eq!(mods.algorithm_clause, AlgorithmClause::Unset);
    assert_eq!(mods.next_auto_inc, NextAutoInc::Ignore);
    assert!(mods.strict_index_order);
}
