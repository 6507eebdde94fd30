//! Dispatchers drain the work queue and hand each URL to a probe.
//!
//! Both disciplines share one loop:
//! - bounded: the dispatcher awaits each probe before taking the next URL,
//!   so a pool of N dispatchers never has more than N probes running;
//! - unbounded: the dispatcher spawns a task per URL and moves on at once,
//!   registering each task in [`OutstandingTasks`] for shutdown.
//!
//! Every dispatcher counts the items it consumes and sleeps for the throttle
//! pause before processing every `throttle_every`th one.

use crate::concurrent::{OutstandingTasks, WorkReceiver};
use crate::executor::Probe;
use crate::stats::ProbeStats;
use crate::types::ProbeConfig;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Per-instance pacing: pause for `pause` on every `every`th item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub every: u64,
    pub pause: Duration,
}

impl Throttle {
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            every: config.throttle_every,
            pause: config.throttle_pause,
        }
    }

    /// A zero period disables throttling.
    pub fn disabled() -> Self {
        Self {
            every: 0,
            pause: Duration::ZERO,
        }
    }

    /// Whether the item with this 1-based sequence number must wait first.
    pub fn applies_to(&self, consumed: u64) -> bool {
        self.every > 0 && consumed % self.every == 0
    }
}

/// How a dispatcher runs the probe for each URL.
#[derive(Debug, Clone)]
enum Execution {
    Inline,
    Spawn(OutstandingTasks),
}

/// What one dispatcher did before the queue closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatcherReport {
    pub id: usize,
    pub consumed: u64,
    pub throttle_pauses: u64,
}

/// A single consumer of the work queue.
pub struct Dispatcher<P: Probe> {
    id: usize,
    queue: WorkReceiver,
    probe: Arc<P>,
    stats: Arc<ProbeStats>,
    throttle: Throttle,
    execution: Execution,
}

impl<P: Probe> Dispatcher<P> {
    /// A pool member that probes each URL before receiving the next.
    pub fn bounded(
        id: usize,
        queue: WorkReceiver,
        probe: Arc<P>,
        stats: Arc<ProbeStats>,
        throttle: Throttle,
    ) -> Self {
        Self {
            id,
            queue,
            probe,
            stats,
            throttle,
            execution: Execution::Inline,
        }
    }

    /// The single dispatcher of an unrestricted run.
    pub fn unbounded(
        queue: WorkReceiver,
        probe: Arc<P>,
        stats: Arc<ProbeStats>,
        throttle: Throttle,
        tasks: OutstandingTasks,
    ) -> Self {
        Self {
            id: 0,
            queue,
            probe,
            stats,
            throttle,
            execution: Execution::Spawn(tasks),
        }
    }

    /// Consume URLs until the queue is closed and empty.
    ///
    /// In unbounded mode this returns as soon as the last task is spawned;
    /// wait on the [`OutstandingTasks`] to know when those finish.
    pub async fn run(self) -> DispatcherReport {
        let mut consumed = 0u64;
        let mut throttle_pauses = 0u64;
        debug!(dispatcher = self.id, "dispatcher started");

        while let Ok(url) = self.queue.recv().await {
            consumed += 1;
            if self.throttle.applies_to(consumed) {
                throttle_pauses += 1;
                tokio::time::sleep(self.throttle.pause).await;
            }

            match &self.execution {
                Execution::Inline => {
                    self.probe.probe(&url, &self.stats).await;
                }
                Execution::Spawn(tasks) => {
                    let guard = tasks.enter();
                    let probe = Arc::clone(&self.probe);
                    let stats = Arc::clone(&self.stats);
                    tokio::spawn(async move {
                        probe.probe(&url, &stats).await;
                        drop(guard);
                    });
                }
            }
        }

        debug!(
            dispatcher = self.id,
            consumed, throttle_pauses, "dispatcher finished"
        );
        DispatcherReport {
            id: self.id,
            consumed,
            throttle_pauses,
        }
    }
}
