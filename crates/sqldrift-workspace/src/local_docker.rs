//! Scratch schema inside a managed local container

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mysql_async::Pool;
use mysql_async::prelude::Queryable;

use sqldrift_core::{Instance, SessionParams, introspect, quote_ident};

use crate::container::{Container, get_or_create_container};
use crate::error::{Result, WorkspaceError};
use crate::image::{host_arch, resolve_image};
use crate::lock::AdvisoryLock;
use crate::{Workspace, WorkspaceOpts, WorkspaceSchema};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(90);

/// Workspace variant running on a locally managed container.
///
/// The container is trusted and private, so the schema is always dropped
/// and recreated wholesale, without the empty-check interlocks the shared
/// temp-schema variant needs.
pub struct LocalDocker {
    instance: Instance,
    schema_name: String,
    base_params: SessionParams,
    lock: Option<AdvisoryLock>,
    container: Arc<Container>,
    default_charset: String,
    default_collation: Option<String>,
}

impl LocalDocker {
    pub(crate) async fn new(opts: &WorkspaceOpts) -> Result<LocalDocker> {
        if opts.flavor.major == 0 {
            return Err(WorkspaceError::UnsupportedFlavor(opts.flavor));
        }

        let resolved = resolve_image(&opts.flavor, host_arch());
        if resolved.substituted {
            tracing::warn!(
                flavor = %opts.flavor,
                arch = host_arch(),
                image = %resolved.image,
                "no native image for this flavor; substituting"
            );
        }

        let container = get_or_create_container(&resolved.image, opts.container_cleanup).await?;
        let instance = Instance::new("127.0.0.1", container.port, "root", None);
        wait_for_server(&instance).await?;

        let lock = AdvisoryLock::acquire(&instance, &opts.lock_name(), opts.lock_timeout).await?;

        let mut base_params = opts.session_params.clone();
        for (name, value) in &resolved.extra_session_params {
            base_params.set(name, value);
        }

        let workspace = LocalDocker {
            instance,
            schema_name: opts.schema_name.clone(),
            base_params,
            lock: Some(lock),
            container,
            default_charset: opts.default_charset.clone(),
            default_collation: opts.default_collation.clone(),
        };

        // Containers never reuse workspace schemas: drop and recreate.
        workspace.drop_schema().await?;
        workspace
            .instance
            .create_schema(
                &workspace.schema_name,
                &workspace.default_charset,
                workspace.default_collation.as_deref(),
            )
            .await
            .map_err(WorkspaceError::Core)?;

        Ok(workspace)
    }

    async fn drop_schema(&self) -> Result<()> {
        let pool = self
            .instance
            .connection_pool(None, &SessionParams::new())
            .await
            .map_err(WorkspaceError::Core)?;
        let mut conn = pool.get_conn().await.map_err(sqldrift_core::Error::from)?;
        conn.query_drop(format!(
            "DROP DATABASE IF EXISTS {}",
            quote_ident(&self.schema_name)
        ))
        .await
        .map_err(sqldrift_core::Error::from)?;
        Ok(())
    }
}

/// Retry protocol-level connects until the server inside the container is
/// actually serving; first boot restarts the server once mid-init.
async fn wait_for_server(instance: &Instance) -> Result<()> {
    let deadline = Instant::now() + CONNECT_TIMEOUT;
    loop {
        match instance.can_connect().await {
            Ok(()) => return Ok(()),
            Err(err) if Instant::now() >= deadline => {
                return Err(WorkspaceError::Container(format!(
                    "server in container did not become ready: {err}"
                )));
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(500)).await,
        }
    }
}

#[async_trait]
impl Workspace for LocalDocker {
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
        // Container shutdown is handled separately at process exit; the
        // per-workspace cleanup only drops the scratch schema.
        tracing::debug!(
            container = %self.container.name,
            schema = %self.schema_name,
            "cleaning up docker workspace"
        );
        let result = self.drop_schema().await;
        if let Some(lock) = self.lock.take() {
            lock.release().await;
        }
        result
    }
}
