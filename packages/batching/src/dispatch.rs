//! Tracking of in-flight batch dispatches for graceful shutdown.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Counting join primitive over fire-and-forget dispatch tasks.
///
/// The count goes up before a task is spawned and down when it finishes,
/// including when it panics. Tasks are never cancelled.
#[derive(Debug, Default)]
pub struct DispatchTracker {
    outstanding: AtomicUsize,
    idle: Notify,
}

/// Decrements the outstanding count when the task ends.
struct DispatchGuard(Arc<DispatchTracker>);

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        if self.0.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl DispatchTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Spawn a tracked task on the current runtime.
    pub fn spawn<F>(self: &Arc<Self>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        let guard = DispatchGuard(Arc::clone(self));
        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    /// Number of tasks that have not finished yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Wait until no tracked task is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a wakeup between the check and the
            // await is not lost.
            notified.as_mut().enable();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }
}
