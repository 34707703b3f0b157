//! Tests for connect-options parsing

use super::*;

#[test]
fn test_parse_simple_options() {
    let params = SessionParams::parse("innodb_lock_wait_timeout=5,lock_wait_timeout=60").unwrap();
    assert_eq!(params.get("innodb_lock_wait_timeout"), Some("5"));
    assert_eq!(params.get("lock_wait_timeout"), Some("60"));
}

#[test]
fn test_parse_quoted_value_with_comma() {
    let params = SessionParams::parse("sql_mode='STRICT_TRANS_TABLES,NO_ENGINE_SUBSTITUTION'").unwrap();
    assert_eq!(
        params.get("sql_mode"),
        Some("'STRICT_TRANS_TABLES,NO_ENGINE_SUBSTITUTION'")
    );
}

#[test]
fn test_reserved_options_rejected() {
    assert!(SessionParams::parse("autocommit=0").is_err());
    assert!(SessionParams::parse("foreign_key_checks=0").is_err());
    assert!(SessionParams::parse("sql_log_bin=0").is_err());
}

#[test]
fn test_malformed_option_rejected() {
    assert!(SessionParams::parse("wait_timeout").is_err());
}

#[test]
fn test_signature_is_order_insensitive() {
    let a = SessionParams::parse("x=1,y=2").unwrap();
    let b = SessionParams::parse("y=2,x=1").unwrap();
    assert_eq!(a.signature(), b.signature());
}

#[test]
fn test_merge_layers_and_set_replaces() {
    let base = SessionParams::parse("wait_timeout=100,x=1").unwrap();
    let over = SessionParams::parse("x=2").unwrap();
    let merged = base.merged_with(&over);
    assert_eq!(merged.get("x"), Some("2"));
    assert_eq!(merged.get("wait_timeout"), Some("100"));

    let mut params = SessionParams::new();
    params.set("a", "1");
    params.set("a", "2");
    assert_eq!(params.get("a"), Some("2"));
    assert_eq!(params.iter().count(), 1);
}

#[test]
fn test_init_statements() {
    let mut params = SessionParams::new();
    params.set("innodb_lock_wait_timeout", "5");
    assert_eq!(
        params.init_statements(),
        vec!["SET SESSION innodb_lock_wait_timeout = 5".to_string()]
    );
}
