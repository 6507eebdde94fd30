//! Request execution and outcome classification.
//!
//! [`HttpProbe`] performs a single timed GET per URL and records the result
//! in [`ProbeStats`]. Dispatchers reach it through the [`Probe`] trait.

use crate::error::ProbeError;
use crate::stats::ProbeStats;
use crate::types::{ProbeConfig, ProbeOutcome};
use crate::utils::parse_url;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::{Duration, Instant};
use tracing::info;

/// Something that can probe one URL and account for it in the stats.
///
/// Implementations must contain every per-URL failure: the returned outcome
/// is the only thing a dispatcher sees.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    async fn probe(&self, url: &str, stats: &ProbeStats) -> ProbeOutcome;
}

/// HTTP GET probe backed by a shared `reqwest::Client`.
///
/// The client carries the per-request timeout and keeps TLS certificate
/// verification enabled. It is cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    success_delay: Duration,
    verbose: bool,
}

impl HttpProbe {
    /// Build the probe and its HTTP client from the run configuration.
    pub fn new(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(false)
            .build()
            .map_err(|e| {
                ProbeError::network_with_source("Failed to create HTTP client", e.to_string())
            })?;

        Ok(Self {
            client,
            success_delay: config.success_delay,
            verbose: config.verbose,
        })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    /// Probe a single URL.
    ///
    /// The checking process:
    /// 1. Parses the URL; malformed input is discarded without touching stats
    /// 2. Sends the GET and measures how long the call took
    /// 3. Records the classified outcome together with that latency
    /// 4. On HTTP 200, waits `success_delay` (not part of the latency)
    async fn probe(&self, url: &str, stats: &ProbeStats) -> ProbeOutcome {
        let target = match parse_url(url) {
            Ok(target) => target,
            Err(e) => {
                if self.verbose {
                    info!("Could not process request: {}", e);
                }
                return ProbeOutcome::Malformed;
            }
        };

        let started = Instant::now();
        let result = {
            let _in_flight = stats.begin_request();
            self.client
                .get(target)
                .header(CONTENT_TYPE, "application/json")
                .send()
                .await
        };
        let elapsed = started.elapsed();

        let outcome = match &result {
            Ok(response) => ProbeOutcome::from_status(response.status().as_u16()),
            Err(_) => ProbeOutcome::ConnectionError,
        };
        stats.record(outcome, elapsed);

        match (&result, outcome) {
            (Err(e), _) if self.verbose => info!(url, "Request Error = {}", e),
            (Ok(response), ProbeOutcome::NotFound | ProbeOutcome::HttpError(_))
                if self.verbose =>
            {
                info!(url, "Status = {}", response.status().as_u16())
            }
            _ => {}
        }
        drop(result);

        if outcome == ProbeOutcome::Success && !self.success_delay.is_zero() {
            tokio::time::sleep(self.success_delay).await;
        }

        outcome
    }
}
