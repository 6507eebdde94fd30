//! Concurrency primitives shared by the producer, dispatchers and runner.
//!
//! - [`work_queue`]: the bounded multi-consumer channel of URLs
//! - [`OutstandingTasks`]: a wait-group for tasks spawned in unbounded mode

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Sending half of the work queue. Owned by the producer only.
pub type WorkSender = async_channel::Sender<String>;

/// Receiving half of the work queue. Cloned into every dispatcher.
pub type WorkReceiver = async_channel::Receiver<String>;

/// Create the bounded work queue.
///
/// Sends wait while `capacity` items are buffered. Once the sender is closed
/// and the buffer drained, every receiver observes the closure.
pub fn work_queue(capacity: usize) -> (WorkSender, WorkReceiver) {
    async_channel::bounded(capacity.max(1))
}

/// Counts spawned probes that have not finished yet.
///
/// Only used to wait for completion at shutdown. It never limits how many
/// tasks may be outstanding.
#[derive(Debug, Clone, Default)]
pub struct OutstandingTasks {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    count: AtomicUsize,
    idle: Notify,
}

impl OutstandingTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one task. The count drops back when the guard is dropped.
    ///
    /// Call this before spawning so the task is counted even if it has not
    /// been scheduled yet.
    pub fn enter(&self) -> TaskGuard {
        self.inner.count.fetch_add(1, Ordering::AcqRel);
        TaskGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Current number of registered tasks.
    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Wait until no task is registered.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // register before checking so a concurrent drop can't be missed
            notified.as_mut().enable();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Keeps one task registered in [`OutstandingTasks`] while alive.
#[derive(Debug)]
pub struct TaskGuard {
    inner: Arc<Inner>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if self.inner.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_queue_closes_after_drain() {
        let (tx, rx) = work_queue(4);
        tx.send("a".to_string()).await.unwrap();
        tx.send("b".to_string()).await.unwrap();
        assert!(tx.close());

        assert_eq!(rx.recv().await.unwrap(), "a");
        assert_eq!(rx.recv().await.unwrap(), "b");
        assert!(rx.recv().await.is_err());
    }

    #[tokio::test]
    async fn test_queue_blocks_when_full() {
        let (tx, rx) = work_queue(1);
        tx.send("first".to_string()).await.unwrap();

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), tx.send("second".to_string())).await;
        assert!(blocked.is_err(), "send should wait on a full queue");

        assert_eq!(rx.recv().await.unwrap(), "first");
        tx.send("second".to_string()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let (tx, rx) = work_queue(0);
        tx.send("x".to_string()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "x");
    }

    #[tokio::test]
    async fn test_wait_idle_returns_immediately_when_empty() {
        let tasks = OutstandingTasks::new();
        tokio::time::timeout(Duration::from_millis(100), tasks.wait_idle())
            .await
            .expect("no tasks registered");
    }

    #[tokio::test]
    async fn test_wait_idle_waits_for_spawned_tasks() {
        let tasks = OutstandingTasks::new();
        for i in 0..10u64 {
            let guard = tasks.enter();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5 * i)).await;
                drop(guard);
            });
        }
        assert_eq!(tasks.count(), 10);

        tokio::time::timeout(Duration::from_secs(2), tasks.wait_idle())
            .await
            .expect("tasks should finish");
        assert_eq!(tasks.count(), 0);
    }
}
