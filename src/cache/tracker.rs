//! In-flight refresh accounting.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

/// Counts detached refresh tasks so a one-shot host can wait for them.
#[derive(Debug, Default)]
pub(crate) struct RefreshTracker {
    active: AtomicUsize,
    idle: Notify,
}

impl RefreshTracker {
    /// Registers a task; the count drops when the ticket is dropped.
    pub(crate) fn start(self: &Arc<Self>) -> RefreshTicket {
        self.active.fetch_add(1, Ordering::SeqCst);
        RefreshTicket(Arc::clone(self))
    }

    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Resolves once no task is in flight.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking the count so a drop in between is not missed.
            notified.as_mut().enable();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Held by a refresh task for its whole lifetime.
#[derive(Debug)]
pub(crate) struct RefreshTicket(Arc<RefreshTracker>);

impl Drop for RefreshTicket {
    fn drop(&mut self) {
        if self.0.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_idle_returns_immediately_when_idle() {
        let tracker = Arc::new(RefreshTracker::default());
        tokio::time::timeout(Duration::from_secs(1), tracker.wait_idle())
            .await
            .unwrap_or_else(|_| panic!("wait_idle should not block"));
    }

    #[tokio::test]
    async fn test_wait_idle_waits_for_tickets() {
        let tracker = Arc::new(RefreshTracker::default());
        let first = tracker.start();
        let second = tracker.start();
        assert_eq!(tracker.active(), 2);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(first);
            tokio::time::sleep(Duration::from_millis(20)).await;
            drop(second);
        });

        tokio::time::timeout(Duration::from_secs(2), tracker.wait_idle())
            .await
            .unwrap_or_else(|_| panic!("wait_idle should finish once tickets drop"));
        assert_eq!(tracker.active(), 0);
        handle.await.unwrap_or_else(|e| panic!("task failed: {e}"));
    }
}
