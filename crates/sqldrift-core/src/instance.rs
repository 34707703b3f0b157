//! Database server instances and shared connection pooling

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts};
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::flavor::{Flavor, Vendor};
use crate::introspect;
use crate::options::SessionParams;
use crate::schema::{Schema, quote_ident};

/// Process-wide pool cache. Pools are keyed by server endpoint, default
/// schema, and session parameters, so any two `Instance` values that
/// compare equal share pools for identical parameter sets.
static POOLS: LazyLock<RwLock<HashMap<PoolKey, Pool>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    host: String,
    port: u16,
    schema: Option<String>,
    params: String,
}

/// How the server treats schema and table name case
/// (`lower_case_table_names`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCaseMode {
    /// 0: names stored and compared as given
    AsIs,
    /// 1: names lowercased on storage and comparison
    Lower,
    /// 2: names stored as given, compared lowercased
    Insensitive,
}

impl NameCaseMode {
    fn from_server_value(value: u8) -> Self {
        match value {
            1 => NameCaseMode::Lower,
            2 => NameCaseMode::Insensitive,
            _ => NameCaseMode::AsIs,
        }
    }

    /// True when object names must be compared case-insensitively.
    pub fn is_insensitive(&self) -> bool {
        !matches!(self, NameCaseMode::AsIs)
    }
}

/// Options for bulk-drop helpers.
#[derive(Debug, Clone)]
pub struct BulkDropOptions {
    /// Refuse to drop anything if any table contains a row. This is the
    /// safety interlock for scratch-schema cleanup.
    pub only_if_empty: bool,
    /// Number of tables dropped per DROP TABLE statement
    pub chunk_size: usize,
}

impl Default for BulkDropOptions {
    fn default() -> Self {
        Self {
            only_if_empty: true,
            chunk_size: 10,
        }
    }
}

#[derive(Debug, Default)]
struct ProbeCache {
    flavor: RwLock<Option<Flavor>>,
    name_case: RwLock<Option<NameCaseMode>>,
}

/// One database server, identified by host and port.
///
/// Cloning is cheap; probe results are shared between clones, and
/// connection pools are shared process-wide through the pool cache.
#[derive(Debug, Clone)]
pub struct Instance {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    probes: Arc<ProbeCache>,
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port
    }
}

impl Eq for Instance {}

impl std::hash::Hash for Instance {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.host.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl Instance {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password,
            probes: Arc::new(ProbeCache::default()),
        }
    }

    /// `host:port` identity string
    pub fn id(&self) -> String {
        self.to_string()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// The configured password; wrapper commands substitute it into
    /// external OSC tool invocations.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Get or create a pool scoped to `default_schema` with the given
    /// session parameters applied to every connection.
    pub async fn connection_pool(
        &self,
        default_schema: Option<&str>,
        params: &SessionParams,
    ) -> Result<Pool> {
        let key = PoolKey {
            host: self.host.clone(),
            port: self.port,
            schema: default_schema.map(|s| s.to_string()),
            params: params.signature(),
        };

        if let Some(pool) = POOLS.read().get(&key) {
            return Ok(pool.clone());
        }

        let constraints = PoolConstraints::new(1, 10).ok_or_else(|| {
            Error::Connection("failed to configure pool constraints".to_string())
        })?;
        let pool_opts = PoolOpts::default()
            .with_constraints(constraints)
            .with_reset_connection(false);

        let mut builder = OptsBuilder::from_opts(Opts::default())
            .ip_or_hostname(&self.host)
            .tcp_port(self.port)
            .user(Some(&self.user))
            .pool_opts(pool_opts);
        if let Some(password) = &self.password {
            builder = builder.pass(Some(password));
        }
        if let Some(schema) = default_schema {
            builder = builder.db_name(Some(schema));
        }
        if !params.is_empty() {
            builder = builder.init(params.init_statements());
        }

        let pool = Pool::new(Opts::from(builder));

        let mut pools = POOLS.write();
        let pool = pools.entry(key).or_insert(pool).clone();
        Ok(pool)
    }

    /// Open a standalone connection outside any pool. Used for sessions
    /// whose server-side state (advisory locks) must be tied to exactly
    /// one connection lifetime.
    pub async fn dedicated_connection(&self) -> Result<Conn> {
        let builder = OptsBuilder::from_opts(Opts::default())
            .ip_or_hostname(&self.host)
            .tcp_port(self.port)
            .user(Some(&self.user))
            .pass(self.password.as_deref());
        Ok(Conn::new(Opts::from(builder)).await?)
    }

    /// Verify connectivity with a round trip.
    #[tracing::instrument(skip(self), fields(instance = %self))]
    pub async fn can_connect(&self) -> Result<()> {
        let pool = self.connection_pool(None, &SessionParams::new()).await?;
        let mut conn = pool.get_conn().await?;
        conn.ping().await?;
        Ok(())
    }

    /// Detect the server flavor, probing once and caching the result.
    pub async fn flavor(&self) -> Result<Flavor> {
        if let Some(flavor) = *self.probes.flavor.read() {
            return Ok(flavor);
        }

        let pool = self.connection_pool(None, &SessionParams::new()).await?;
        let mut conn = pool.get_conn().await?;
        let row: Option<(String, String)> = conn
            .query_first("SELECT @@global.version, @@global.version_comment")
            .await?;
        let (version, comment) = row.ok_or_else(|| {
            Error::Introspection("server did not report a version".to_string())
        })?;

        let mut flavor = Flavor::detect(&version, &comment);
        let aurora: Option<(String, String)> = conn
            .query_first("SHOW GLOBAL VARIABLES LIKE 'aurora_version'")
            .await?;
        if aurora.is_some() {
            flavor.vendor = Vendor::Aurora;
        }

        tracing::debug!(instance = %self, flavor = %flavor, "detected server flavor");
        *self.probes.flavor.write() = Some(flavor);
        Ok(flavor)
    }

    /// Probe `lower_case_table_names`, caching the result.
    pub async fn name_case(&self) -> Result<NameCaseMode> {
        if let Some(mode) = *self.probes.name_case.read() {
            return Ok(mode);
        }

        let pool = self.connection_pool(None, &SessionParams::new()).await?;
        let mut conn = pool.get_conn().await?;
        let value: Option<u8> = conn
            .query_first("SELECT @@global.lower_case_table_names")
            .await?;
        let mode = NameCaseMode::from_server_value(value.unwrap_or(0));
        *self.probes.name_case.write() = Some(mode);
        Ok(mode)
    }

    /// Introspect a named schema. Returns `Ok(None)` when the schema does
    /// not exist.
    pub async fn introspect_schema(&self, name: &str) -> Result<Option<Schema>> {
        let flavor = self.flavor().await?;
        let pool = self.connection_pool(None, &SessionParams::new()).await?;
        introspect::introspect_schema(&pool, name, &flavor).await
    }

    pub async fn schema_exists(&self, name: &str) -> Result<bool> {
        let pool = self.connection_pool(None, &SessionParams::new()).await?;
        let mut conn = pool.get_conn().await?;
        let row: Option<String> = conn
            .exec_first(
                "SELECT SCHEMA_NAME FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = ?",
                (name,),
            )
            .await?;
        Ok(row.is_some())
    }

    #[tracing::instrument(skip(self), fields(instance = %self))]
    pub async fn create_schema(
        &self,
        name: &str,
        charset: &str,
        collation: Option<&str>,
    ) -> Result<()> {
        let pool = self.connection_pool(None, &SessionParams::new()).await?;
        let mut conn = pool.get_conn().await?;
        let mut sql = format!(
            "CREATE DATABASE {} CHARACTER SET {charset}",
            quote_ident(name)
        );
        if let Some(collation) = collation {
            sql.push_str(&format!(" COLLATE {collation}"));
        }
        conn.query_drop(sql).await?;
        Ok(())
    }

    pub async fn alter_schema_charset(
        &self,
        name: &str,
        charset: &str,
        collation: Option<&str>,
    ) -> Result<()> {
        let pool = self.connection_pool(None, &SessionParams::new()).await?;
        let mut conn = pool.get_conn().await?;
        let mut sql = format!(
            "ALTER DATABASE {} CHARACTER SET {charset}",
            quote_ident(name)
        );
        if let Some(collation) = collation {
            sql.push_str(&format!(" COLLATE {collation}"));
        }
        conn.query_drop(sql).await?;
        Ok(())
    }

    /// List base table names in a schema.
    pub async fn table_names(&self, schema: &str) -> Result<Vec<String>> {
        let pool = self.connection_pool(None, &SessionParams::new()).await?;
        let mut conn = pool.get_conn().await?;
        let names: Vec<String> = conn
            .exec(
                "SELECT TABLE_NAME FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE' ORDER BY TABLE_NAME",
                (schema,),
            )
            .await?;
        Ok(names)
    }

    /// Estimated size of a table in bytes. A table that is actually empty
    /// reports size 0 even when stale metadata says otherwise.
    pub async fn table_size(&self, schema: &str, table: &str) -> Result<u64> {
        let pool = self.connection_pool(None, &SessionParams::new()).await?;
        let mut conn = pool.get_conn().await?;
        let row: Option<(Option<u64>, Option<u64>)> = conn
            .exec_first(
                "SELECT TABLE_ROWS, DATA_LENGTH + INDEX_LENGTH \
                 FROM information_schema.TABLES WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?",
                (schema, table),
            )
            .await?;
        let Some((_, size)) = row else {
            return Ok(0);
        };
        let probe: Option<u8> = conn
            .query_first(format!(
                "SELECT 1 FROM {}.{} LIMIT 1",
                quote_ident(schema),
                quote_ident(table)
            ))
            .await?;
        if probe.is_none() {
            return Ok(0);
        }
        Ok(size.unwrap_or(0))
    }

    /// True if any table in the schema contains at least one row.
    pub async fn schema_has_rows(&self, schema: &str) -> Result<Option<String>> {
        let pool = self.connection_pool(None, &SessionParams::new()).await?;
        let mut conn = pool.get_conn().await?;
        for table in self.table_names(schema).await? {
            let probe: Option<u8> = conn
                .query_first(format!(
                    "SELECT 1 FROM {}.{} LIMIT 1",
                    quote_ident(schema),
                    quote_ident(&table)
                ))
                .await?;
            if probe.is_some() {
                return Ok(Some(table));
            }
        }
        Ok(None)
    }

    /// Drop every table in a schema, in chunks.
    #[tracing::instrument(skip(self, opts), fields(instance = %self))]
    pub async fn drop_tables_in_schema(
        &self,
        schema: &str,
        opts: &BulkDropOptions,
    ) -> Result<()> {
        if opts.only_if_empty
            && let Some(table) = self.schema_has_rows(schema).await?
        {
            return Err(Error::NotEmpty(format!(
                "table {}.{} contains rows; refusing bulk drop",
                quote_ident(schema),
                quote_ident(&table)
            )));
        }

        let tables = self.table_names(schema).await?;
        if tables.is_empty() {
            return Ok(());
        }

        let pool = self.connection_pool(None, &SessionParams::new()).await?;
        let mut conn = pool.get_conn().await?;
        conn.query_drop("SET SESSION foreign_key_checks = 0").await?;
        for chunk in tables.chunks(opts.chunk_size.max(1)) {
            let list = chunk
                .iter()
                .map(|t| format!("{}.{}", quote_ident(schema), quote_ident(t)))
                .collect::<Vec<_>>()
                .join(", ");
            conn.query_drop(format!("DROP TABLE IF EXISTS {list}")).await?;
        }
        Ok(())
    }

    /// Drop every stored procedure and function in a schema.
    pub async fn drop_routines_in_schema(&self, schema: &str) -> Result<()> {
        let pool = self.connection_pool(None, &SessionParams::new()).await?;
        let mut conn = pool.get_conn().await?;
        let routines: Vec<(String, String)> = conn
            .exec(
                "SELECT ROUTINE_NAME, ROUTINE_TYPE FROM information_schema.ROUTINES \
                 WHERE ROUTINE_SCHEMA = ?",
                (schema,),
            )
            .await?;
        for (name, routine_type) in routines {
            conn.query_drop(format!(
                "DROP {} IF EXISTS {}.{}",
                routine_type,
                quote_ident(schema),
                quote_ident(&name)
            ))
            .await?;
        }
        Ok(())
    }

    /// Drop an entire schema. With `only_if_empty`, refuses if any table
    /// contains rows.
    #[tracing::instrument(skip(self), fields(instance = %self))]
    pub async fn drop_schema(&self, schema: &str, only_if_empty: bool) -> Result<()> {
        if only_if_empty
            && let Some(table) = self.schema_has_rows(schema).await?
        {
            return Err(Error::NotEmpty(format!(
                "table {}.{} contains rows; refusing to drop schema",
                quote_ident(schema),
                quote_ident(&table)
            )));
        }
        let pool = self.connection_pool(None, &SessionParams::new()).await?;
        let mut conn = pool.get_conn().await?;
        conn.query_drop(format!("DROP DATABASE IF EXISTS {}", quote_ident(schema)))
            .await?;
        Ok(())
    }
}
