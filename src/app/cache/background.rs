//! Tracked background cache writes
//!
//! Population runs detached from the request that triggered it, but every
//! detached task is registered here so shutdown (and tests) can wait for the
//! cache to settle.

use std::future::Future;

use tokio_util::task::TaskTracker;
use tracing::debug;

/// Tracker for detached population tasks
#[derive(Debug, Clone, Default)]
pub struct BackgroundWrites {
    tracker: TaskTracker,
}

impl BackgroundWrites {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a tracked task on the current runtime
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task);
    }

    /// Number of tasks still running
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every task spawned so far has finished
    ///
    /// Tasks spawned while draining are waited for as well. The tracker stays
    /// usable afterwards.
    pub async fn drain(&self) {
        let pending = self.tracker.len();
        if pending > 0 {
            debug!("Waiting for {} background cache writes", pending);
        }
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_drain_waits_for_tasks() {
        let writes = BackgroundWrites::new();
        let done = Arc::new(AtomicUsize::new(0));

        for delay in [5u64, 20, 40] {
            let done = Arc::clone(&done);
            writes.spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        writes.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(writes.pending(), 0);
    }

    #[tokio::test]
    async fn test_tracker_reusable_after_drain() {
        let writes = BackgroundWrites::new();
        writes.drain().await;

        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        writes.spawn(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        writes.drain().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
