//! Core data types for URL probing.
//!
//! This module defines the run configuration, the concurrency discipline
//! derived from it, and the classification of a single probe.

use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capacity of the work queue between the producer and the dispatchers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Every this many items, a dispatcher pauses before handling the next one.
pub const DEFAULT_THROTTLE_EVERY: u64 = 1000;

/// Length of the dispatcher throttle pause.
pub const DEFAULT_THROTTLE_PAUSE: Duration = Duration::from_millis(50);

/// Simulated processing cost after a successful response.
pub const DEFAULT_SUCCESS_DELAY: Duration = Duration::from_millis(50);

/// Interval between periodic stats reports.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a probe run.
///
/// The first four fields are what a user normally sets. The remaining ones
/// carry the engine's fixed tuning values and default to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Spawn a task per URL instead of using a fixed worker pool
    pub unrestricted: bool,

    /// Number of workers in bounded mode. Ignored when `unrestricted` is set.
    pub concurrency: usize,

    /// Total timeout for each request
    #[serde(skip)]
    pub timeout: Duration,

    /// Log every failed or discarded URL
    pub verbose: bool,

    /// Work queue capacity (producer blocks when full)
    pub queue_capacity: usize,

    /// Dispatcher throttle period, in consumed items
    pub throttle_every: u64,

    #[serde(skip)]
    pub throttle_pause: Duration,

    #[serde(skip)]
    pub success_delay: Duration,

    #[serde(skip)]
    pub report_interval: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            unrestricted: false,
            concurrency: 0,
            timeout: DEFAULT_TIMEOUT,
            verbose: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            throttle_every: DEFAULT_THROTTLE_EVERY,
            throttle_pause: DEFAULT_THROTTLE_PAUSE,
            success_delay: DEFAULT_SUCCESS_DELAY,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }
}

impl ProbeConfig {
    /// Bounded configuration with a fixed worker count.
    pub fn bounded(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Self::default()
        }
    }

    /// Unbounded configuration: one dispatcher spawning a task per URL.
    pub fn unrestricted() -> Self {
        Self {
            unrestricted: true,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the throttle period and pause length.
    pub fn with_throttle(mut self, every: u64, pause: Duration) -> Self {
        self.throttle_every = every;
        self.throttle_pause = pause;
        self
    }

    pub fn with_success_delay(mut self, delay: Duration) -> Self {
        self.success_delay = delay;
        self
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Resolve the concurrency discipline.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError::ConfigError` when the run is not unrestricted
    /// and no positive worker count was given.
    pub fn mode(&self) -> Result<ConcurrencyMode, ProbeError> {
        if self.unrestricted {
            Ok(ConcurrencyMode::Unbounded)
        } else if self.concurrency == 0 {
            Err(ProbeError::config(
                "Must specify either --unrestricted or number of concurrent requests (--concurrent).",
            ))
        } else {
            Ok(ConcurrencyMode::Bounded {
                workers: self.concurrency,
            })
        }
    }

    /// Check the configuration before any work is started.
    pub fn validate(&self) -> Result<(), ProbeError> {
        self.mode()?;
        if self.timeout.is_zero() {
            return Err(ProbeError::config("Timeout must be greater than zero"));
        }
        if self.report_interval.is_zero() {
            return Err(ProbeError::config(
                "Report interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Concurrency discipline of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ConcurrencyMode {
    /// A fixed pool of dispatchers, each probing one URL at a time
    Bounded { workers: usize },

    /// A single dispatcher spawning an independent task per URL
    Unbounded,
}

impl ConcurrencyMode {
    /// Number of dispatcher instances this mode runs.
    pub fn dispatcher_count(&self) -> usize {
        match self {
            ConcurrencyMode::Bounded { workers } => *workers,
            ConcurrencyMode::Unbounded => 1,
        }
    }
}

impl std::fmt::Display for ConcurrencyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConcurrencyMode::Bounded { workers } => write!(f, "Concurrent Requests = {}", workers),
            ConcurrencyMode::Unbounded => write!(f, "Unrestricted"),
        }
    }
}

/// Classification of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// HTTP 200
    Success,

    /// HTTP 404
    NotFound,

    /// Any other HTTP status
    HttpError(u16),

    /// Transport failure: timeout, DNS, refused, TLS, ...
    ConnectionError,

    /// The URL could not be turned into a request; not counted
    Malformed,
}

impl ProbeOutcome {
    /// Classify a received HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            200 => ProbeOutcome::Success,
            404 => ProbeOutcome::NotFound,
            other => ProbeOutcome::HttpError(other),
        }
    }
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeOutcome::Success => write!(f, "success"),
            ProbeOutcome::NotFound => write!(f, "not found (404)"),
            ProbeOutcome::HttpError(code) => write!(f, "status {}", code),
            ProbeOutcome::ConnectionError => write!(f, "connection error"),
            ProbeOutcome::Malformed => write!(f, "malformed"),
        }
    }
}
