//! Local container management for docker workspaces
//!
//! Containers are long-lived and keyed by a name derived from their
//! image, so repeated runs against the same flavor reuse one server. The
//! store is process-global; shutdown actions are deferred to process exit
//! and scoped by name prefix so concurrent processes do not stomp each
//! other's containers.

use std::collections::HashMap;
use std::process::Stdio;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::sync::Mutex;

use sqldrift_core::Error;

use crate::error::{Result, WorkspaceError};
use crate::shutdown::register_shutdown_hook;

/// Name prefix for every container this tool manages.
pub const CONTAINER_PREFIX: &str = "sqldrift-";

const SERVER_START_TIMEOUT: Duration = Duration::from_secs(120);

/// What happens to managed containers at process exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerCleanup {
    /// Leave containers running for the next invocation
    #[default]
    None,
    /// Stop containers but keep them on disk
    Stop,
    /// Remove containers entirely; their data dir runs on tmpfs
    Destroy,
}

impl FromStr for ContainerCleanup {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "none" => Ok(ContainerCleanup::None),
            "stop" => Ok(ContainerCleanup::Stop),
            "destroy" => Ok(ContainerCleanup::Destroy),
            other => Err(Error::Config(format!("invalid docker-cleanup '{other}'"))),
        }
    }
}

/// A managed local container running a database server.
#[derive(Debug)]
pub struct Container {
    pub name: String,
    pub image: String,
    /// Host port mapped to the server port inside the container
    pub port: u16,
}

static STORE: LazyLock<Mutex<HashMap<String, Arc<Container>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Derive the managed container name for an image.
pub fn container_name(image: &str) -> String {
    let slug: String = image
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '-' })
        .collect();
    format!("{CONTAINER_PREFIX}{slug}")
}

/// Look up or create the managed container for an image.
///
/// The first caller for a given name starts (or restarts) the container
/// and registers its shutdown action; later callers share the handle.
pub async fn get_or_create_container(
    image: &str,
    cleanup: ContainerCleanup,
) -> Result<Arc<Container>> {
    let name = container_name(image);
    let mut store = STORE.lock().await;
    if let Some(container) = store.get(&name) {
        return Ok(container.clone());
    }

    let container = Arc::new(start_container(&name, image, cleanup).await?);
    store.insert(name, container.clone());

    if cleanup != ContainerCleanup::None {
        let hook_name = container.name.clone();
        register_shutdown_hook(move || async move {
            if let Err(err) = apply_cleanup(&hook_name, cleanup).await {
                tracing::warn!(container = %hook_name, error = %err, "container cleanup failed");
            }
        });
    }

    Ok(container)
}

/// Apply a shutdown action to every managed container whose name starts
/// with `prefix`.
pub async fn shutdown_containers(prefix: &str, cleanup: ContainerCleanup) -> Result<()> {
    let mut store = STORE.lock().await;
    let names: Vec<String> = store
        .keys()
        .filter(|name| name.starts_with(prefix))
        .cloned()
        .collect();
    for name in names {
        apply_cleanup(&name, cleanup).await?;
        if cleanup == ContainerCleanup::Destroy {
            store.remove(&name);
        }
    }
    Ok(())
}

async fn apply_cleanup(name: &str, cleanup: ContainerCleanup) -> Result<()> {
    match cleanup {
        ContainerCleanup::None => Ok(()),
        ContainerCleanup::Stop => {
            tracing::info!(container = %name, "stopping container");
            docker(&["stop", name]).await.map(|_| ())
        }
        ContainerCleanup::Destroy => {
            tracing::info!(container = %name, "destroying container");
            docker(&["rm", "-f", name]).await.map(|_| ())
        }
    }
}

async fn start_container(
    name: &str,
    image: &str,
    cleanup: ContainerCleanup,
) -> Result<Container> {
    match container_state(name).await? {
        ContainerState::Running => {}
        ContainerState::Stopped => {
            tracing::info!(container = %name, "starting existing container");
            docker(&["start", name]).await?;
        }
        ContainerState::Missing => {
            tracing::info!(container = %name, image = %image, "creating container");
            let mut args = vec![
                "run",
                "-d",
                "--name",
                name,
                "-e",
                "MYSQL_ALLOW_EMPTY_PASSWORD=1",
                "-e",
                "MARIADB_ALLOW_EMPTY_ROOT_PASSWORD=1",
                "-p",
                "127.0.0.1:0:3306",
            ];
            // Destroyed-on-exit containers trade durability for speed.
            if cleanup == ContainerCleanup::Destroy {
                args.extend_from_slice(&["--tmpfs", "/var/lib/mysql"]);
            }
            args.push(image);
            docker(&args).await?;
        }
    }

    let port = mapped_port(name).await?;
    wait_for_listener(port).await?;
    Ok(Container {
        name: name.to_string(),
        image: image.to_string(),
        port,
    })
}

enum ContainerState {
    Running,
    Stopped,
    Missing,
}

async fn container_state(name: &str) -> Result<ContainerState> {
    let output = Command::new("docker")
        .args(["container", "inspect", "-f", "{{.State.Running}}", name])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|err| WorkspaceError::Container(format!("cannot run docker: {err}")))?;
    if !output.status.success() {
        return Ok(ContainerState::Missing);
    }
    match String::from_utf8_lossy(&output.stdout).trim() {
        "true" => Ok(ContainerState::Running),
        _ => Ok(ContainerState::Stopped),
    }
}

async fn mapped_port(name: &str) -> Result<u16> {
    let output = docker(&["port", name, "3306/tcp"]).await?;
    // Format: "127.0.0.1:49154" (possibly multiple lines for v4/v6)
    output
        .lines()
        .filter_map(|line| line.rsplit(':').next())
        .find_map(|port| port.trim().parse().ok())
        .ok_or_else(|| {
            WorkspaceError::Container(format!("cannot determine mapped port for '{name}'"))
        })
}

/// Wait for something to accept TCP connections on the mapped port. The
/// caller still retries at the protocol level: the server restarts once
/// during first-boot initialization.
async fn wait_for_listener(port: u16) -> Result<()> {
    let deadline = Instant::now() + SERVER_START_TIMEOUT;
    loop {
        if tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(WorkspaceError::Container(format!(
                "server on port {port} did not start within {SERVER_START_TIMEOUT:?}"
            )));
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

async fn docker(args: &[&str]) -> Result<String> {
    tracing::debug!(args = ?args, "invoking docker");
    let output = Command::new("docker")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|err| WorkspaceError::Container(format!("cannot run docker: {err}")))?;
    if !output.status.success() {
        return Err(WorkspaceError::Container(format!(
            "docker {} failed: {}",
            args.first().unwrap_or(&""),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
