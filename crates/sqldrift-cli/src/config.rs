//! Per-directory configuration files
//!
//! Each directory of the desired-state tree may carry a `sqldrift.toml`
//! naming the servers and schema it maps, plus lint configuration.
//! Values apply to that directory and, for connection settings, are
//! inherited by subdirectories that do not override them.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use sqldrift_apply::{DirConfig, TargetOptions};
use sqldrift_core::{Error, Result};
use sqldrift_lint::Severity;

pub const CONFIG_FILE_NAME: &str = "sqldrift.toml";

/// On-disk shape of `sqldrift.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub hosts: Option<Vec<String>>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub schema: Option<String>,
    pub flavor: Option<String>,
    pub default_character_set: Option<String>,
    pub default_collation: Option<String>,
    pub allow_engine: Option<Vec<String>>,
    pub allow_charset: Option<Vec<String>>,
    pub allow_definer: Option<Vec<String>>,
    /// Rule name to severity: ignore, warning, or error
    pub lint: Option<HashMap<String, String>>,
}

/// Load the config file of one directory, if present.
pub fn load_file_config(dir: &Path) -> Result<Option<FileConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    let config: FileConfig = toml::from_str(&content)
        .map_err(|err| Error::Config(format!("{}: {err}", path.display())))?;
    Ok(Some(config))
}

impl FileConfig {
    /// Layer this file's connection settings onto an inherited config.
    pub fn apply_to_dir_config(&self, base: &DirConfig) -> Result<DirConfig> {
        let mut config = base.clone();
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(hosts) = &self.hosts {
            config.hosts = hosts.clone();
        } else if let Some(host) = &self.host {
            config.hosts = vec![host.clone()];
        }
        if let Some(schema) = &self.schema {
            config.schema = Some(schema.clone());
        }
        if let Some(flavor) = &self.flavor {
            config.flavor = Some(flavor.parse()?);
        }
        Ok(config)
    }

    /// Layer this file's lint settings onto the inherited options.
    pub fn apply_to_options(&self, base: &TargetOptions) -> Result<TargetOptions> {
        let mut opts = base.clone();
        if let Some(engines) = &self.allow_engine {
            opts.lint_options.allowed_engines = engines.clone();
        }
        if let Some(charsets) = &self.allow_charset {
            opts.lint_options.allowed_charsets = charsets.clone();
        }
        if let Some(definers) = &self.allow_definer {
            opts.lint_options.allowed_definers = definers.clone();
        }
        if let Some(lint) = &self.lint {
            for (rule, severity) in lint {
                let severity: Severity = severity.parse()?;
                opts.lint_options
                    .severity_overrides
                    .insert(rule.clone(), severity);
            }
        }
        if let Some(flavor) = &self.flavor {
            opts.workspace.flavor = flavor.parse()?;
        }
        if let Some(charset) = &self.default_character_set {
            opts.workspace.default_charset = charset.clone();
        }
        if let Some(collation) = &self.default_collation {
            opts.workspace.default_collation = Some(collation.clone());
        }
        Ok(opts)
    }
}
