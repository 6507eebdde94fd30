//! Periodic and final stats reporting.
//!
//! The [`Reporter`] task wakes every `report_interval`, measured from the
//! moment the stats were created, and hands a snapshot to a [`ReportSink`].
//! It only reads atomics, so it never holds anything a probe waits on.
//!
//! [`FinalReport`] is a drop guard: once created, the final snapshot is
//! emitted however the run ends.

use crate::stats::{ProbeStats, StatsSnapshot};
use crate::types::ConcurrencyMode;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Separator printed once, after the first periodic report.
pub const REPORT_SEPARATOR: &str = "==================================";

/// A snapshot labelled with the run's concurrency discipline.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    #[serde(flatten)]
    pub mode: ConcurrencyMode,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

impl StatsReport {
    pub fn new(mode: ConcurrencyMode, stats: StatsSnapshot) -> Self {
        Self { mode, stats }
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.mode)?;
        write!(f, "{}", self.stats)
    }
}

/// Destination for stats reports.
pub trait ReportSink: Send + Sync + 'static {
    /// Called by the periodic timer. `first` is true for the first report.
    fn periodic(&self, report: &StatsReport, first: bool);

    /// Called once when the run ends.
    fn final_report(&self, report: &StatsReport);
}

/// Turns a report into the text printed for it.
pub type RenderText = fn(&StatsReport) -> String;

fn plain_text(report: &StatsReport) -> String {
    report.to_string()
}

/// Stdout output, text or one JSON object per report.
///
/// Text goes through a [`RenderText`] function so frontends can restyle it
/// without changing what is printed when.
#[derive(Clone, Copy)]
pub struct StdoutSink {
    json: bool,
    render: RenderText,
}

impl fmt::Debug for StdoutSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdoutSink").field("json", &self.json).finish()
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new(false)
    }
}

impl StdoutSink {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            render: plain_text,
        }
    }

    /// Replace the plain `Display` rendering used in text mode.
    pub fn with_renderer(mut self, render: RenderText) -> Self {
        self.render = render;
        self
    }

    /// Everything printed for one report, separator included.
    pub fn format(
        &self,
        report: &StatsReport,
        first_periodic: bool,
    ) -> Result<String, serde_json::Error> {
        if self.json {
            return serde_json::to_string(report);
        }
        let mut out = (self.render)(report);
        if first_periodic {
            out.push('\n');
            out.push_str(REPORT_SEPARATOR);
        }
        Ok(out)
    }

    fn emit(&self, report: &StatsReport, first_periodic: bool) {
        match self.format(report, first_periodic) {
            Ok(out) => println!("{}", out),
            Err(e) => tracing::warn!("failed to serialize stats: {}", e),
        }
    }
}

impl ReportSink for StdoutSink {
    fn periodic(&self, report: &StatsReport, first: bool) {
        self.emit(report, first);
    }

    fn final_report(&self, report: &StatsReport) {
        self.emit(report, false);
    }
}

/// Background task that reports on a fixed interval.
///
/// The task is aborted when the `Reporter` is dropped.
#[derive(Debug)]
pub struct Reporter {
    handle: JoinHandle<()>,
}

impl Reporter {
    /// Start reporting. The first report fires one `interval` after the
    /// stats' start time.
    pub fn spawn(
        stats: Arc<ProbeStats>,
        mode: ConcurrencyMode,
        interval: Duration,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::from_std(stats.started()) + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut first = true;
            loop {
                ticker.tick().await;
                sink.periodic(&StatsReport::new(mode, stats.snapshot()), first);
                first = false;
            }
        });

        Self { handle }
    }

    /// Stop the timer. No further periodic reports are emitted.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Emits the final report when dropped.
pub struct FinalReport {
    stats: Arc<ProbeStats>,
    mode: ConcurrencyMode,
    sink: Arc<dyn ReportSink>,
}

impl FinalReport {
    pub fn new(stats: Arc<ProbeStats>, mode: ConcurrencyMode, sink: Arc<dyn ReportSink>) -> Self {
        Self { stats, mode, sink }
    }
}

impl Drop for FinalReport {
    fn drop(&mut self) {
        self.sink
            .final_report(&StatsReport::new(self.mode, self.stats.snapshot()));
    }
}
