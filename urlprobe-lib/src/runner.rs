//! Run orchestration.
//!
//! A run wires the pieces together in this order:
//! 1. Stats are created and the final-report guard is armed
//! 2. The URL source is opened (a failure ends the run here)
//! 3. Dispatchers and the periodic reporter are started
//! 4. The producer fills the queue on the calling task, then closes it
//! 5. All dispatchers are joined, then all spawned probes are awaited
//! 6. The reporter is stopped and the final report is emitted

use crate::concurrent::{work_queue, OutstandingTasks};
use crate::dispatcher::{Dispatcher, DispatcherReport, Throttle};
use crate::error::ProbeError;
use crate::executor::{HttpProbe, Probe};
use crate::producer::{open_source, produce};
use crate::reporter::{FinalReport, ReportSink, Reporter, StdoutSink};
use crate::stats::{ProbeStats, StatsSnapshot};
use crate::types::{ConcurrencyMode, ProbeConfig};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tracing::debug;

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: ConcurrencyMode,

    /// Items the producer put on the queue (header excluded)
    pub enqueued: u64,

    pub dispatchers: Vec<DispatcherReport>,

    /// Spawned probes still registered when the run ended; always 0
    pub outstanding_tasks: usize,

    /// Stats after every probe has finished
    pub stats: StatsSnapshot,
}

impl RunSummary {
    pub fn throttle_pauses(&self) -> u64 {
        self.dispatchers.iter().map(|d| d.throttle_pauses).sum()
    }

    pub fn consumed(&self) -> u64 {
        self.dispatchers.iter().map(|d| d.consumed).sum()
    }
}

/// Drives a complete probe run.
///
/// # Example
///
/// ```rust,no_run
/// use urlprobe_lib::{ProbeConfig, ProbeRunner};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let runner = ProbeRunner::new(ProbeConfig::bounded(50))?;
///     let summary = runner.run_file("urls.txt").await?;
///     println!("{} requests", summary.stats.requests);
///     Ok(())
/// }
/// ```
pub struct ProbeRunner<P: Probe = HttpProbe> {
    config: ProbeConfig,
    mode: ConcurrencyMode,
    probe: Arc<P>,
    sink: Arc<dyn ReportSink>,
}

impl ProbeRunner<HttpProbe> {
    /// Create a runner that probes over HTTP and reports to stdout.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError::ConfigError` for an invalid configuration and
    /// `ProbeError::NetworkError` if the HTTP client cannot be built.
    pub fn new(config: ProbeConfig) -> Result<Self, ProbeError> {
        config.validate()?;
        let probe = HttpProbe::new(&config)?;
        Self::with_probe(config, probe)
    }
}

impl<P: Probe> ProbeRunner<P> {
    /// Create a runner around any [`Probe`] implementation.
    pub fn with_probe(config: ProbeConfig, probe: P) -> Result<Self, ProbeError> {
        config.validate()?;
        let mode = config.mode()?;
        Ok(Self {
            config,
            mode,
            probe: Arc::new(probe),
            sink: Arc::new(StdoutSink::default()),
        })
    }

    /// Send periodic and final reports somewhere other than stdout.
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probe every URL listed in a file (first line is a header).
    ///
    /// If the file cannot be opened the run stops before any dispatcher or
    /// reporter starts; the final (empty) report is still emitted.
    pub async fn run_file<Q: AsRef<Path>>(&self, path: Q) -> Result<RunSummary, ProbeError> {
        let stats = Arc::new(ProbeStats::new());
        let _final_report =
            FinalReport::new(Arc::clone(&stats), self.mode, Arc::clone(&self.sink));

        let reader = open_source(path).await?;
        self.drive(&stats, reader).await
    }

    /// Probe every URL read from an already open line source.
    pub async fn run_reader<R>(&self, reader: R) -> Result<RunSummary, ProbeError>
    where
        R: AsyncBufRead + Unpin,
    {
        let stats = Arc::new(ProbeStats::new());
        let _final_report =
            FinalReport::new(Arc::clone(&stats), self.mode, Arc::clone(&self.sink));

        self.drive(&stats, reader).await
    }

    async fn drive<R>(&self, stats: &Arc<ProbeStats>, reader: R) -> Result<RunSummary, ProbeError>
    where
        R: AsyncBufRead + Unpin,
    {
        let reporter = Reporter::spawn(
            Arc::clone(stats),
            self.mode,
            self.config.report_interval,
            Arc::clone(&self.sink),
        );

        let (queue_tx, queue_rx) = work_queue(self.config.queue_capacity);
        let tasks = OutstandingTasks::new();
        let throttle = Throttle::from_config(&self.config);

        let handles: Vec<_> = (0..self.mode.dispatcher_count())
            .map(|id| {
                let dispatcher = match self.mode {
                    ConcurrencyMode::Bounded { .. } => Dispatcher::bounded(
                        id,
                        queue_rx.clone(),
                        Arc::clone(&self.probe),
                        Arc::clone(stats),
                        throttle,
                    ),
                    ConcurrencyMode::Unbounded => Dispatcher::unbounded(
                        queue_rx.clone(),
                        Arc::clone(&self.probe),
                        Arc::clone(stats),
                        throttle,
                        tasks.clone(),
                    ),
                };
                tokio::spawn(dispatcher.run())
            })
            .collect();
        drop(queue_rx);
        debug!(dispatchers = handles.len(), mode = %self.mode, "dispatchers started");

        let enqueued = produce(reader, queue_tx).await;

        let mut dispatchers = Vec::with_capacity(handles.len());
        for handle in handles {
            dispatchers.push(handle.await?);
        }
        tasks.wait_idle().await;
        reporter.stop();

        let summary = RunSummary {
            mode: self.mode,
            enqueued,
            dispatchers,
            outstanding_tasks: tasks.count(),
            stats: stats.snapshot(),
        };
        debug!(
            enqueued,
            requests = summary.stats.requests,
            classified = summary.stats.classified(),
            "run finished"
        );
        Ok(summary)
    }
}
