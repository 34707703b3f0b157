//! Server-side advisory locks with a keep-alive maintainer
//!
//! The lock is held by a dedicated connection. A background task pings
//! every 750 ms so connection death is noticed promptly and, because the
//! server ties GET_LOCK ownership to the session, also releases the lock.

use std::time::{Duration, Instant};

use mysql_async::prelude::Queryable;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use sqldrift_core::Instance;

use crate::error::{Result, WorkspaceError};

const KEEPALIVE_INTERVAL: Duration = Duration::from_millis(750);
const ACQUIRE_RETRY_DELAY: Duration = Duration::from_millis(250);

/// A held advisory lock. Dropping without calling `release` stops the
/// maintainer on its next tick; the server releases the lock when the
/// dedicated connection closes.
pub(crate) struct AdvisoryLock {
    name: String,
    stop: watch::Sender<bool>,
    maintainer: Option<JoinHandle<()>>,
}

impl AdvisoryLock {
    /// Acquire the named lock, retrying until `timeout` elapses.
    pub(crate) async fn acquire(
        instance: &Instance,
        name: &str,
        timeout: Duration,
    ) -> Result<AdvisoryLock> {
        let mut conn = instance.dedicated_connection().await.map_err(WorkspaceError::Core)?;

        let deadline = Instant::now() + timeout;
        loop {
            let acquired: Option<u8> = conn
                .exec_first("SELECT GET_LOCK(?, 0)", (name,))
                .await
                .map_err(sqldrift_core::Error::from)?;
            if acquired == Some(1) {
                break;
            }
            if Instant::now() >= deadline {
                return Err(WorkspaceError::LockBusy(name.to_string()));
            }
            tokio::time::sleep(ACQUIRE_RETRY_DELAY).await;
        }

        tracing::debug!(lock = %name, "acquired workspace advisory lock");

        let (stop, mut stop_rx) = watch::channel(false);
        let lock_name = name.to_string();
        let maintainer = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(KEEPALIVE_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = conn.query_drop("SELECT 1").await {
                            // Connection death releases the lock server-side.
                            tracing::warn!(lock = %lock_name, error = %err, "advisory lock connection lost");
                            return;
                        }
                    }
                    _ = stop_rx.changed() => break,
                }
            }
            let _ = conn
                .exec_drop("SELECT RELEASE_LOCK(?)", (lock_name.as_str(),))
                .await;
            let _ = conn.disconnect().await;
            tracing::debug!(lock = %lock_name, "released workspace advisory lock");
        });

        Ok(AdvisoryLock {
            name: name.to_string(),
            stop,
            maintainer: Some(maintainer),
        })
    }

    /// Release the lock and wait for the maintainer to finish.
    pub(crate) async fn release(mut self) {
        let _ = self.stop.send(true);
        if let Some(maintainer) = self.maintainer.take() {
            let _ = maintainer.await;
        }
    }
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        if self.maintainer.is_some() {
            tracing::debug!(lock = %self.name, "advisory lock dropped without explicit release");
            let _ = self.stop.send(true);
        }
    }
}
