//! Scratch schema on a pre-existing shared server

use async_trait::async_trait;
use mysql_async::Pool;

use sqldrift_core::{BulkDropOptions, Instance, SessionParams, introspect};

use crate::error::{Result, WorkspaceError};
use crate::lock::AdvisoryLock;
use crate::{Workspace, WorkspaceOpts, WorkspaceSchema};

/// Workspace variant using a scratch schema on a caller-supplied server.
///
/// The schema may be reused between runs (`reuse_temp_schema`); the
/// advisory lock serializes its use across concurrent processes, and the
/// only-if-empty interlock on every drop guards against pointing the tool
/// at a schema holding real data.
pub struct TempSchema {
    instance: Instance,
    schema_name: String,
    base_params: SessionParams,
    lock: Option<AdvisoryLock>,
    reuse: bool,
    drop_chunk_size: usize,
    one_shot_drop: bool,
}

impl TempSchema {
    pub(crate) async fn new(opts: &WorkspaceOpts) -> Result<TempSchema> {
        let instance = opts
            .instance
            .clone()
            .ok_or(WorkspaceError::InstanceRequired)?;

        let lock = AdvisoryLock::acquire(&instance, &opts.lock_name(), opts.lock_timeout).await?;

        let flavor = instance.flavor().await.map_err(WorkspaceError::Core)?;
        let mut base_params = opts.session_params.clone();
        if flavor.has_fk_metadata_locking() {
            // MySQL 8 extends FK metadata locks to parent tables, so DDL
            // in the workspace can block on unrelated sessions. Keep the
            // wait short so conflicts surface as retryable errors.
            let timeout = if cfg!(test) { 2 } else { 5 };
            base_params.set("lock_wait_timeout", &timeout.to_string());
        }
        if opts.disable_binlog && flavor.allows_disabling_binlog() {
            base_params.set("sql_log_bin", "0");
        }

        let workspace = TempSchema {
            schema_name: opts.schema_name.clone(),
            base_params,
            lock: Some(lock),
            reuse: opts.reuse_temp_schema,
            drop_chunk_size: opts.mode.drop_chunk_size(),
            one_shot_drop: opts.mode.one_shot_drop(),
            instance,
        };

        if workspace
            .instance
            .schema_exists(&workspace.schema_name)
            .await
            .map_err(WorkspaceError::Core)?
        {
            workspace.drop_contents().await?;
            workspace
                .instance
                .alter_schema_charset(
                    &workspace.schema_name,
                    &opts.default_charset,
                    opts.default_collation.as_deref(),
                )
                .await
                .map_err(WorkspaceError::Core)?;
        } else {
            workspace
                .instance
                .create_schema(
                    &workspace.schema_name,
                    &opts.default_charset,
                    opts.default_collation.as_deref(),
                )
                .await
                .map_err(WorkspaceError::Core)?;
        }

        Ok(workspace)
    }

    async fn drop_contents(&self) -> Result<()> {
        let drop_opts = BulkDropOptions {
            only_if_empty: true,
            chunk_size: self.drop_chunk_size,
        };
        self.instance
            .drop_tables_in_schema(&self.schema_name, &drop_opts)
            .await
            .map_err(WorkspaceError::Core)?;
        self.instance
            .drop_routines_in_schema(&self.schema_name)
            .await
            .map_err(WorkspaceError::Core)?;
        Ok(())
    }
}

#[async_trait]
impl Workspace for TempSchema {
    fn instance(&self) -> &Instance {
        &self.instance
    }

    fn schema_name(&self) -> &str {
        &self.schema_name
    }

    async fn connection_pool(&self, params: &SessionParams) -> Result<Pool> {
        let merged = self.base_params.merged_with(params);
        self.instance
            .connection_pool(Some(&self.schema_name), &merged)
            .await
            .map_err(WorkspaceError::Core)
    }

    async fn introspect(&self) -> Result<WorkspaceSchema> {
        let flavor = self.instance.flavor().await.map_err(WorkspaceError::Core)?;
        let pool = self.connection_pool(&SessionParams::new()).await?;
        let schema = introspect::introspect_schema(&pool, &self.schema_name, &flavor)
            .await
            .map_err(WorkspaceError::Core)?
            .ok_or_else(|| {
                WorkspaceError::Core(sqldrift_core::Error::Introspection(format!(
                    "workspace schema '{}' disappeared",
                    self.schema_name
                )))
            })?;
        let sql_mode = introspect::session_sql_mode(&pool)
            .await
            .map_err(WorkspaceError::Core)?;
        Ok(WorkspaceSchema {
            schema,
            flavor,
            sql_mode,
        })
    }

    async fn cleanup(&mut self) -> Result<()> {
        let result = if self.reuse {
            self.drop_contents().await
        } else {
            // One-shot schema drops skip the per-table pass but keep the
            // only-if-empty interlock inside drop_schema.
            if !self.one_shot_drop {
                self.drop_contents().await?;
            }
            self.instance
                .drop_schema(&self.schema_name, true)
                .await
                .map_err(WorkspaceError::Core)
        };

        if let Some(lock) = self.lock.take() {
            lock.release().await;
        }
        result
    }
}
