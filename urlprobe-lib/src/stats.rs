//! Lock-free run statistics.
//!
//! Every counter is a separate atomic updated with `fetch_add`. A snapshot
//! reads each field independently, so fields are not mutually consistent
//! while requests are still in flight. Once all probes have returned, the
//! attempt counter equals the sum of the four outcome counters.

use crate::types::ProbeOutcome;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Process-wide counters for a probe run.
#[derive(Debug)]
pub struct ProbeStats {
    requests: AtomicU64,
    connect_errors: AtomicU64,
    not_200_errors: AtomicU64,
    not_found_errors: AtomicU64,
    successes: AtomicU64,
    request_time_ns: AtomicU64,
    in_flight: AtomicU64,
    peak_in_flight: AtomicU64,
    started: Instant,
    started_at: SystemTime,
}

impl Default for ProbeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeStats {
    /// Create zeroed stats; the start timestamp is taken now.
    pub fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            connect_errors: AtomicU64::new(0),
            not_200_errors: AtomicU64::new(0),
            not_found_errors: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            request_time_ns: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            peak_in_flight: AtomicU64::new(0),
            started: Instant::now(),
            started_at: SystemTime::now(),
        }
    }

    /// Record a classified probe and its measured latency.
    ///
    /// Malformed URLs are ignored: they never count as an attempt.
    pub fn record(&self, outcome: ProbeOutcome, elapsed: Duration) {
        let counter = match outcome {
            ProbeOutcome::Malformed => return,
            ProbeOutcome::Success => &self.successes,
            ProbeOutcome::NotFound => &self.not_found_errors,
            ProbeOutcome::HttpError(_) => &self.not_200_errors,
            ProbeOutcome::ConnectionError => &self.connect_errors,
        };
        self.add_request_time(elapsed);
        self.requests.fetch_add(1, Ordering::Relaxed);
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Add to the cumulative request latency.
    pub fn add_request_time(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.request_time_ns.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Mark one network call as started. The returned guard ends it on drop.
    pub fn begin_request(&self) -> InFlightGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::AcqRel);
        InFlightGuard { stats: self }
    }

    /// Number of network calls currently in progress.
    pub fn in_flight(&self) -> u64 {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Highest number of simultaneous network calls seen so far.
    pub fn peak_in_flight(&self) -> u64 {
        self.peak_in_flight.load(Ordering::Acquire)
    }

    /// The instant stats were created, used to align the report timer.
    pub fn started(&self) -> Instant {
        self.started
    }

    /// Read every counter without locking.
    pub fn snapshot(&self) -> StatsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let request_time_ns = self.request_time_ns.load(Ordering::Relaxed);

        StatsSnapshot {
            requests,
            connect_errors: self.connect_errors.load(Ordering::Relaxed),
            not_200_errors: self.not_200_errors.load(Ordering::Relaxed),
            not_found_errors: self.not_found_errors.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            request_time_ns,
            avg_request_ms: average_ms(request_time_ns, requests),
            in_flight: self.in_flight(),
            peak_in_flight: self.peak_in_flight(),
            elapsed: self.started.elapsed(),
            started_at_unix: self
                .started_at
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        }
    }
}

/// Decrements the in-flight gauge when dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    stats: &'a ProbeStats,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

fn average_ms(total_ns: u64, requests: u64) -> f64 {
    if requests == 0 {
        return 0.0;
    }
    total_ns as f64 / requests as f64 / 1_000_000.0
}

/// Point-in-time copy of [`ProbeStats`] with derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub connect_errors: u64,
    pub not_200_errors: u64,
    pub not_found_errors: u64,
    pub successes: u64,
    pub request_time_ns: u64,

    /// Cumulative latency / attempts / 1e6; 0.0 before the first attempt
    pub avg_request_ms: f64,

    pub in_flight: u64,
    pub peak_in_flight: u64,

    /// Wall-clock time since the stats were created
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,

    pub started_at_unix: u64,
}

impl StatsSnapshot {
    /// Sum of the four outcome counters.
    ///
    /// Equal to `requests` once no probe is in flight.
    pub fn classified(&self) -> u64 {
        self.connect_errors + self.not_200_errors + self.not_found_errors + self.successes
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of Requests = {}", self.requests)?;
        writeln!(f, "Connection Errors = {}", self.connect_errors)?;
        writeln!(f, "Not 200 = {}", self.not_200_errors)?;
        writeln!(f, "Not Found (404) = {}", self.not_found_errors)?;
        writeln!(f, "Success = {}", self.successes)?;
        writeln!(f, "Avg Request Time (ms) = {:.3}", self.avg_request_ms)?;
        write!(f, "Time Taken (sec) = {:.3}", self.elapsed.as_secs_f64())
    }
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}
