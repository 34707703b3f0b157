//! Process-exit hooks
//!
//! Long-lived side effects (running containers) register cleanup here;
//! the binary runs the hooks exactly once on exit or interrupt.

use std::pin::Pin;
use std::sync::LazyLock;

use parking_lot::Mutex;

type Hook = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

static HOOKS: LazyLock<Mutex<Vec<Hook>>> = LazyLock::new(|| Mutex::new(Vec::new()));

/// Register a hook to run at process shutdown. Hooks run in registration
/// order.
pub fn register_shutdown_hook<F, Fut>(hook: F)
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    HOOKS.lock().push(Box::new(move || Box::pin(hook())));
}

/// Run and drain all registered hooks. Safe to call more than once; later
/// calls see an empty list.
pub async fn run_shutdown_hooks() {
    let hooks: Vec<Hook> = std::mem::take(&mut *HOOKS.lock());
    if !hooks.is_empty() {
        tracing::debug!(count = hooks.len(), "running shutdown hooks");
    }
    for hook in hooks {
        hook().await;
    }
}
