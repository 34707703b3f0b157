//! Tests for introspection helpers that need no live server

use super::*;

#[test]
fn test_extract_partitioning_versioned_comment() {
    let create = "CREATE TABLE `events` (\n  `id` int NOT NULL\n) ENGINE=InnoDB\n/*!50100 PARTITION BY RANGE (`id`)\n(PARTITION p0 VALUES LESS THAN (100) ENGINE = InnoDB) */";
    let clause = extract_partitioning(create).unwrap();
    assert!(clause.starts_with("PARTITION BY RANGE"));
    assert!(!clause.ends_with("*/"));
}

#[test]
fn test_extract_partitioning_absent() {
    let create = "CREATE TABLE `t` (`id` int) ENGINE=InnoDB";
    assert_eq!(extract_partitioning(create), None);
}

#[test]
fn test_normalize_default_variants() {
    // Numeric types keep bare defaults
    assert_eq!(
        normalize_default("int unsigned", false, Some("0".to_string()), ""),
        Some("0".to_string())
    );
    // String types get quoted
    assert_eq!(
        normalize_default("varchar(10)", false, Some("abc".to_string()), ""),
        Some("'abc'".to_string())
    );
    // Embedded quotes are escaped
    assert_eq!(
        normalize_default("varchar(10)", false, Some("it's".to_string()), ""),
        Some("'it''s'".to_string())
    );
    // Expression defaults stay bare
    assert_eq!(
        normalize_default(
            "timestamp",
            true,
            Some("CURRENT_TIMESTAMP".to_string()),
            "DEFAULT_GENERATED"
        ),
        Some("CURRENT_TIMESTAMP".to_string())
    );
    // Nullable without explicit default gets implicit NULL
    assert_eq!(
        normalize_default("varchar(10)", true, None, ""),
        Some("NULL".to_string())
    );
    // NOT NULL without default has no default clause
    assert_eq!(normalize_default("varchar(10)", false, None, ""), None);
}

#[test]
fn test_extract_on_update() {
    assert_eq!(
        extract_on_update("DEFAULT_GENERATED on update CURRENT_TIMESTAMP"),
        Some("CURRENT_TIMESTAMP".to_string())
    );
    assert_eq!(extract_on_update("auto_increment"), None);
}
