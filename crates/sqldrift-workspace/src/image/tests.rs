//! Tests for container image resolution

use sqldrift_core::Flavor;

use super::*;

fn flavor(s: &str) -> Flavor {
    s.parse().unwrap()
}

fn resolve(s: &str, arch: &str) -> ResolvedImage {
    resolve_image(&flavor(s), arch)
}

#[test]
fn test_mysql_amd64_uses_official_images() {
    assert_eq!(resolve("mysql:5.7", "amd64").image, "mysql:5.7");
    assert_eq!(resolve("mysql:8.0", "amd64").image, "mysql:8.0");
    assert_eq!(resolve("mysql:8.0.36", "amd64").image, "mysql:8.0.36");
    assert!(!resolve("mysql:5.7", "amd64").substituted);
}

#[test]
fn test_mysql_arm64_image_ranges() {
    // 8.0.12-8.0.28 only existed on arm64 as mysql/mysql-server
    assert_eq!(
        resolve("mysql:8.0.20", "arm64").image,
        "mysql/mysql-server:8.0.20"
    );
    // 8.0.29+ moved to the official image
    assert_eq!(resolve("mysql:8.0.29", "arm64").image, "mysql:8.0.29");
    assert_eq!(resolve("mysql:8.0", "arm64").image, "mysql:8.0");
    assert_eq!(resolve("mysql:8.4", "arm64").image, "mysql:8.4");
    // Below 8.0.12 there is nothing to run
    assert!(resolve("mysql:8.0.11", "arm64").substituted);
    assert!(resolve("mysql:5.6", "arm64").substituted);
}

#[test]
fn test_mysql_5x_substitution_approximates_collation() {
    let resolved = resolve("mysql:5.7", "arm64");
    assert_eq!(resolved.image, "mysql:8.0");
    assert!(resolved.substituted);
    assert_eq!(
        resolved.extra_session_params,
        vec![(
            "default_collation_for_utf8mb4".to_string(),
            "utf8mb4_general_ci".to_string()
        )]
    );
}

#[test]
fn test_mysql_8_substitution_has_no_collation_param() {
    let resolved = resolve("mysql:8.0.5", "arm64");
    assert!(resolved.substituted);
    assert!(resolved.extra_session_params.is_empty());
}

#[test]
fn test_percona_5x() {
    assert_eq!(resolve("percona:5.7", "amd64").image, "percona:5.7");
    assert!(resolve("percona:5.7", "arm64").substituted);
}

#[test]
fn test_percona_8_arm64_suffix_ranges() {
    assert_eq!(
        resolve("percona:8.0.30", "amd64").image,
        "percona/percona-server:8.0.30"
    );
    assert!(resolve("percona:8.0.30", "arm64").substituted);
    assert_eq!(
        resolve("percona:8.0.33", "arm64").image,
        "percona/percona-server:8.0.33-aarch64"
    );
    assert_eq!(
        resolve("percona:8.0.40", "arm64").image,
        "percona/percona-server:8.0.40-aarch64"
    );
    assert_eq!(
        resolve("percona:8.1", "arm64").image,
        "percona/percona-server:8.1.0-aarch64"
    );
    assert_eq!(
        resolve("percona:8.3", "arm64").image,
        "percona/percona-server:8.3.0-aarch64"
    );
    assert_eq!(
        resolve("percona:8.4.2", "arm64").image,
        "percona/percona-server:8.4.2-aarch64"
    );
    assert_eq!(
        resolve("percona:8.4.4", "arm64").image,
        "percona/percona-server:8.4.4"
    );
    assert_eq!(
        resolve("percona:8.0.41", "arm64").image,
        "percona/percona-server:8.0.41"
    );
}

#[test]
fn test_aurora_falls_through_to_mysql() {
    assert_eq!(resolve("aurora:5.6", "amd64").image, "mysql:5.6");
    assert_eq!(resolve("aurora:5.7", "amd64").image, "mysql:5.7");
    assert_eq!(resolve("aurora:8.0", "amd64").image, "mysql:8.0");
    assert_eq!(resolve("aurora:8.0.36", "amd64").image, "mysql:8.0.36");

    // Architecture rules apply after the fallthrough
    let resolved = resolve("aurora:5.7", "arm64");
    assert!(resolved.substituted);
    assert!(!resolved.extra_session_params.is_empty());
}

#[test]
fn test_mariadb_images() {
    assert_eq!(resolve("mariadb:10.6", "amd64").image, "mariadb:10.6");
    assert_eq!(resolve("mariadb:11.4", "arm64").image, "mariadb:11.4");
}
