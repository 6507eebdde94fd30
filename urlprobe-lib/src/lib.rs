//! # urlprobe Library
//!
//! Bulk HTTP GET probing of a URL list with two concurrency disciplines,
//! per-request outcome classification and lock-free aggregate statistics.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use urlprobe_lib::{ProbeConfig, ProbeRunner};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ProbeConfig::bounded(20).with_timeout(Duration::from_secs(3));
//!     let summary = ProbeRunner::new(config)?.run_file("urls.txt").await?;
//!
//!     println!("{} ok of {}", summary.stats.successes, summary.stats.requests);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Bounded mode**: a fixed pool of workers, one request each at a time
//! - **Unrestricted mode**: one dispatcher spawning a task per URL
//! - **Backpressure**: a bounded queue stalls reading, never the workers
//! - **Live stats**: periodic reports plus a final report on shutdown
//! - **Configurable**: TOML config files and `UP_*` environment variables

// Re-export main public API types and functions
pub use concurrent::{work_queue, OutstandingTasks, TaskGuard, WorkReceiver, WorkSender};
pub use config::{load_env_config, ConfigManager, DefaultsConfig, EnvConfig, FileConfig};
pub use dispatcher::{Dispatcher, DispatcherReport, Throttle};
pub use error::ProbeError;
pub use executor::{HttpProbe, Probe};
pub use producer::{open_source, produce};
pub use reporter::{
    FinalReport, RenderText, ReportSink, Reporter, StatsReport, StdoutSink, REPORT_SEPARATOR,
};
pub use runner::{ProbeRunner, RunSummary};
pub use stats::{InFlightGuard, ProbeStats, StatsSnapshot};
pub use types::{
    ConcurrencyMode, ProbeConfig, ProbeOutcome, DEFAULT_QUEUE_CAPACITY, DEFAULT_REPORT_INTERVAL,
    DEFAULT_SUCCESS_DELAY, DEFAULT_THROTTLE_EVERY, DEFAULT_THROTTLE_PAUSE, DEFAULT_TIMEOUT,
};
pub use utils::{parse_duration, parse_url};

// Internal modules - the public surface is the re-exports above
mod concurrent;
mod config;
mod dispatcher;
mod error;
mod executor;
mod producer;
mod reporter;
mod runner;
mod stats;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ProbeError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
