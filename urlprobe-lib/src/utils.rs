//! Utility functions for URL and duration handling.

use crate::error::ProbeError;
use reqwest::Url;
use std::time::Duration;

/// Turn a queued item into a request URL.
///
/// Only absolute `http`/`https` URLs can be requested. Anything else,
/// including the empty string left by a blank input line, is malformed.
///
/// # Arguments
///
/// * `raw` - The trimmed line taken from the work queue
///
/// # Returns
///
/// The parsed URL, or `ProbeError::InvalidUrl` describing why it was rejected.
pub fn parse_url(raw: &str) -> Result<Url, ProbeError> {
    if raw.is_empty() {
        return Err(ProbeError::invalid_url(raw, "empty URL"));
    }

    let url = Url::parse(raw).map_err(|e| ProbeError::invalid_url(raw, e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ProbeError::invalid_url(
                raw,
                format!("unsupported scheme '{}'", other),
            ))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ProbeError::invalid_url(raw, "missing host"));
    }

    Ok(url)
}

/// Parse a duration string like "500ms", "5s", "2m", "1h".
///
/// A bare number is taken as seconds.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();

    let (number, unit_ms): (&str, u64) = if let Some(n) = input.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = input.strip_suffix('s') {
        (n, 1_000)
    } else if let Some(n) = input.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = input.strip_suffix('h') {
        (n, 3_600_000)
    } else {
        (input.as_str(), 1_000)
    };

    number
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(unit_ms))
        .map(Duration::from_millis)
}
