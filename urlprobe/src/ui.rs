//! Terminal rendering of stats reports.
//!
//! Reports go to stdout so they never interleave with the tracing output
//! on stderr. Styling is dropped automatically when stdout is not a tty.

use console::style;
use std::time::Duration;
use urlprobe_lib::{ConcurrencyMode, StatsReport, StdoutSink};

/// Report sink for the CLI: styled text or one JSON object per report.
pub fn console_sink(json: bool) -> StdoutSink {
    StdoutSink::new(json).with_renderer(render_text)
}

/// Text form of a report: the mode line highlighted, then one line per stat.
pub fn render_text(report: &StatsReport) -> String {
    format!(
        "{}\n{}",
        style(report.mode.to_string()).yellow().bold(),
        report.stats
    )
}

/// Startup banner for verbose runs, written to stderr.
pub fn print_header(file: &str, mode: ConcurrencyMode, timeout: Duration) {
    eprintln!(
        "{} {} {}",
        style("urlprobe").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!("probing {}", file)).dim(),
    );
    eprintln!(
        "{}",
        style(format!("{} | Timeout: {:?}", mode, timeout)).dim()
    );
}
