//! Server flavor detection and capability predicates

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Database server vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Mysql,
    Mariadb,
    Percona,
    Aurora,
}

impl Vendor {
    /// Returns the vendor name as used in flavor strings
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Mysql => "mysql",
            Vendor::Mariadb => "mariadb",
            Vendor::Percona => "percona",
            Vendor::Aurora => "aurora",
        }
    }

    /// True for vendors that track MySQL semantics (everything but MariaDB)
    pub fn is_mysql_compatible(&self) -> bool {
        !matches!(self, Vendor::Mariadb)
    }
}

/// A server variant: vendor plus version.
///
/// Parsed from strings such as `mysql:8.0`, `percona:8.0.33` or
/// `mariadb:10.6`, or detected from a live server's version variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flavor {
    pub vendor: Vendor,
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
}

impl Flavor {
    pub fn new(vendor: Vendor, major: u32, minor: u32) -> Self {
        Self {
            vendor,
            major,
            minor,
            patch: None,
        }
    }

    pub fn with_patch(mut self, patch: u32) -> Self {
        self.patch = Some(patch);
        self
    }

    /// Detect a flavor from a server's `@@version` and `@@version_comment`.
    pub fn detect(version: &str, version_comment: &str) -> Self {
        let lower_version = version.to_lowercase();
        let lower_comment = version_comment.to_lowercase();

        let vendor = if lower_version.contains("mariadb") || lower_comment.contains("mariadb") {
            Vendor::Mariadb
        } else if lower_comment.contains("percona") {
            Vendor::Percona
        } else {
            Vendor::Mysql
        };

        let (major, minor, patch) = parse_version(version);
        Self {
            vendor,
            major,
            minor,
            patch,
        }
    }

    /// `major.minor` as a tuple, for ordered comparisons
    pub fn version(&self) -> (u32, u32) {
        (self.major, self.minor)
    }

    /// `major.minor.patch`, defaulting patch to 0
    pub fn version_with_patch(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch.unwrap_or(0))
    }

    /// True if this flavor is at least the given MySQL-lineage version.
    /// Always false for MariaDB.
    pub fn min_mysql(&self, major: u32, minor: u32) -> bool {
        self.vendor.is_mysql_compatible() && self.version() >= (major, minor)
    }

    /// True if this flavor is at least the given MariaDB version.
    pub fn min_mariadb(&self, major: u32, minor: u32) -> bool {
        self.vendor == Vendor::Mariadb && self.version() >= (major, minor)
    }

    /// MySQL 8.0+ extends metadata locks on DDL to foreign-key parent
    /// tables, so concurrent DDL in one schema can deadlock through FKs.
    pub fn has_fk_metadata_locking(&self) -> bool {
        self.min_mysql(8, 0)
    }

    /// True when the server supports `ALGORITHM=` clauses on ALTER TABLE
    /// (MySQL-lineage 5.6+, MariaDB 10.0+).
    pub fn supports_algorithm_clause(&self) -> bool {
        self.min_mysql(5, 6) || self.min_mariadb(10, 0)
    }

    /// True when the server supports `ALGORITHM=INSTANT`.
    pub fn supports_instant_ddl(&self) -> bool {
        self.min_mysql(8, 0) || self.min_mariadb(10, 3)
    }

    /// Default collation for utf8mb4 on this server family.
    pub fn default_utf8mb4_collation(&self) -> &'static str {
        if self.min_mysql(8, 0) {
            "utf8mb4_0900_ai_ci"
        } else {
            "utf8mb4_general_ci"
        }
    }

    /// True when binary logging can be disabled per-session via
    /// `sql_log_bin=0`. Aurora does not allow it.
    pub fn allows_disabling_binlog(&self) -> bool {
        self.vendor != Vendor::Aurora
    }
}

fn parse_version(version: &str) -> (u32, u32, Option<u32>) {
    let numeric: String = version
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let mut parts = numeric.split('.');
    let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let patch = parts.next().and_then(|p| p.parse().ok());
    (major, minor, patch)
}

impl FromStr for Flavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (vendor_str, version_str) = s
            .split_once(':')
            .ok_or_else(|| Error::Config(format!("invalid flavor '{s}': expected vendor:version")))?;

        let vendor = match vendor_str.to_lowercase().as_str() {
            "mysql" => Vendor::Mysql,
            "mariadb" => Vendor::Mariadb,
            "percona" => Vendor::Percona,
            "aurora" => Vendor::Aurora,
            other => {
                return Err(Error::Config(format!("unknown flavor vendor '{other}'")));
            }
        };

        let (major, minor, patch) = parse_version(version_str);
        if major == 0 {
            return Err(Error::Config(format!(
                "invalid flavor '{s}': missing version number"
            )));
        }

        Ok(Flavor {
            vendor,
            major,
            minor,
            patch,
        })
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.patch {
            Some(patch) => write!(
                f,
                "{}:{}.{}.{}",
                self.vendor.as_str(),
                self.major,
                self.minor,
                patch
            ),
            None => write!(f, "{}:{}.{}", self.vendor.as_str(), self.major, self.minor),
        }
    }
}
