//! Cleanup for futures abandoned mid-await.
//!
//! A timeout or a cancelled caller drops a future at whatever `.await` it is
//! suspended on. Radio resources acquired before that point are released by
//! a [`CleanupGuard`] instead.

use std::future::Future;

use tracing::warn;

/// Runs a cleanup closure on drop unless disarmed.
pub(crate) struct CleanupGuard<F: FnOnce()> {
    cleanup: Option<F>,
}

impl<F: FnOnce()> CleanupGuard<F> {
    /// Arm a guard that runs `cleanup` if dropped before [`Self::disarm`].
    pub(crate) fn new(cleanup: F) -> Self {
        Self {
            cleanup: Some(cleanup),
        }
    }

    /// The protected section completed; skip the cleanup.
    pub(crate) fn disarm(mut self) {
        self.cleanup = None;
    }
}

impl<F: FnOnce()> Drop for CleanupGuard<F> {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

/// Spawn an async cleanup task on the current runtime.
///
/// Used from `Drop`, where the cleanup cannot be awaited.
pub(crate) fn spawn_cleanup<Fut>(what: &str, task: Fut)
where
    Fut: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
        }
        Err(_) => warn!("No runtime available to {}", what),
    }
}
