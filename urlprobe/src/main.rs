//! urlprobe CLI Application
//!
//! Sends an HTTP GET to every URL in a file, either through a fixed pool of
//! workers or with one task per URL, and reports aggregate latency and
//! outcome counts while the run is in progress.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};
use urlprobe_lib::{
    load_env_config, parse_duration, ConfigManager, EnvConfig, FileConfig, ProbeConfig,
    ProbeError, ProbeRunner, RunSummary,
};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for urlprobe
#[derive(Parser, Debug)]
#[command(name = "urlprobe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Probe a list of URLs with concurrent HTTP GET requests")]
#[command(
    long_about = "Probe a list of URLs with concurrent HTTP GET requests.\n\nThe first line of the input file is a header and is skipped. Stats are reported every 10 seconds and once more when the run ends."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Make all requests at once, one task per URL
    #[arg(long = "unrestricted", help_heading = "Concurrency")]
    pub unrestricted: bool,

    /// Number of concurrent requests (ignored with --unrestricted)
    #[arg(
        short = 'c',
        long = "concurrent",
        value_name = "N",
        help_heading = "Concurrency"
    )]
    pub concurrent: Option<usize>,

    /// File with one URL per line (first line is a header)
    #[arg(short = 'f', long = "file", value_name = "FILE", help_heading = "Input")]
    pub file: Option<String>,

    /// Per-request timeout, e.g. 500ms, 5s, 2m (default: 5s)
    #[arg(
        short = 't',
        long = "timeout",
        value_name = "DURATION",
        value_parser = parse_duration_arg,
        help_heading = "Requests"
    )]
    pub timeout: Option<Duration>,

    /// Log every failed request to stderr (applies even when RUST_LOG is set)
    #[arg(short = 'v', long = "verbose", help_heading = "Output")]
    pub verbose: bool,

    /// Print reports as JSON objects
    #[arg(long = "json", help_heading = "Output")]
    pub json: bool,

    /// Use a specific config file instead of discovering one
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let log_filter = init_logging(args.verbose);

    let env_config = load_env_config(args.verbose);

    let config = match build_config(&args, &env_config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // verbose may also come from UP_VERBOSE or a config file
    if let Err(e) = log_filter.reload(build_log_filter(config.verbose)) {
        tracing::warn!("failed to update log filter: {}", e);
    }

    // Nothing is probed without a concurrency discipline; this is not a failure
    match config.mode() {
        Ok(_) => {}
        Err(ProbeError::ConfigError { message }) => {
            println!("{}", message);
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }

    let file = match resolve_input_file(&args, &env_config) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_probe(config, &file, args.json).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

type LogFilterHandle = reload::Handle<EnvFilter, Registry>;

/// Install the stderr log subscriber. The returned handle swaps the filter
/// once the final verbose setting is known.
fn init_logging(verbose: bool) -> LogFilterHandle {
    let (filter, handle) = reload::Layer::new(build_log_filter(verbose));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();

    handle
}

/// `RUST_LOG`, or warnings only when unset.
///
/// Verbose mode always adds info for the urlprobe crates on top, since the
/// per-failure lines are logged at that level.
fn build_log_filter(verbose: bool) -> EnvFilter {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if verbose {
        for directive in ["urlprobe=info", "urlprobe_lib=info"] {
            if let Ok(directive) = directive.parse::<Directive>() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

async fn run_probe(config: ProbeConfig, file: &str, json: bool) -> Result<RunSummary, ProbeError> {
    let runner = ProbeRunner::new(config)?.with_sink(Arc::new(ui::console_sink(json)));

    if runner.config().verbose {
        ui::print_header(file, runner.mode(), runner.config().timeout);
    }

    runner.run_file(file).await
}

/// Build the probe configuration with proper precedence.
///
/// Precedence (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables (UP_*)
/// 3. Config file: --config, then UP_CONFIG, otherwise discovered
///    (./urlprobe.toml > ~/.urlprobe.toml > ~/.config/urlprobe/config.toml)
/// 4. Built-in defaults
fn build_config(
    args: &Args,
    env_config: &EnvConfig,
) -> Result<ProbeConfig, Box<dyn std::error::Error>> {
    let mut config = ProbeConfig::default();
    let config_manager = ConfigManager::new(args.verbose);

    let explicit_path = args.config.as_ref().or(env_config.config.as_ref());
    let file_config = match explicit_path {
        Some(path) => config_manager
            .load_file(path)
            .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?,
        None => config_manager.discover_and_load()?,
    };
    config = merge_file_config_into_probe_config(config, file_config);

    config = apply_environment_config(config, env_config);

    config = apply_cli_args_to_config(config, args);

    Ok(config)
}

/// Merge FileConfig into ProbeConfig
fn merge_file_config_into_probe_config(
    mut config: ProbeConfig,
    file_config: FileConfig,
) -> ProbeConfig {
    let Some(defaults) = file_config.defaults else {
        return config;
    };

    if let Some(unrestricted) = defaults.unrestricted {
        config.unrestricted = unrestricted;
    }
    if let Some(concurrency) = defaults.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(verbose) = defaults.verbose {
        config = config.with_verbose(verbose);
    }
    if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_duration) {
        config = config.with_timeout(timeout);
    }
    if let Some(interval) = defaults.report_interval.as_deref().and_then(parse_duration) {
        config = config.with_report_interval(interval);
    }

    config
}

/// Apply UP_* environment variables on top of file defaults.
fn apply_environment_config(mut config: ProbeConfig, env_config: &EnvConfig) -> ProbeConfig {
    if let Some(concurrency) = env_config.concurrency {
        config.concurrency = concurrency;
        // a worker count chosen here replaces an unrestricted default from a file
        config.unrestricted = false;
    }
    if let Some(unrestricted) = env_config.unrestricted {
        config.unrestricted = unrestricted;
    }
    if let Some(verbose) = env_config.verbose {
        config = config.with_verbose(verbose);
    }
    if let Some(timeout) = env_config.timeout.as_deref().and_then(parse_duration) {
        config = config.with_timeout(timeout);
    }

    config
}

/// Apply CLI arguments to config (highest precedence).
///
/// Boolean flags only ever switch a setting on; leaving a flag out keeps
/// whatever the environment or a config file chose.
fn apply_cli_args_to_config(mut config: ProbeConfig, args: &Args) -> ProbeConfig {
    if let Some(concurrent) = args.concurrent {
        config.concurrency = concurrent;
        config.unrestricted = false;
    }
    if args.unrestricted {
        config.unrestricted = true;
    }
    if let Some(timeout) = args.timeout {
        config.timeout = timeout;
    }
    if args.verbose {
        config.verbose = true;
    }

    config
}

/// The input file comes from --file, then UP_FILE.
fn resolve_input_file(args: &Args, env_config: &EnvConfig) -> Result<String, String> {
    args.file
        .clone()
        .or_else(|| env_config.file.clone())
        .ok_or_else(|| "No input file given. Use --file <FILE> or set UP_FILE".to_string())
}

/// Parse a positive duration for `--timeout`.
fn parse_duration_arg(raw: &str) -> Result<Duration, String> {
    match parse_duration(raw) {
        Some(d) if !d.is_zero() => Ok(d),
        Some(_) => Err("timeout must be greater than zero".to_string()),
        None => Err(format!(
            "invalid duration '{}', use a format like '500ms', '5s' or '2m'",
            raw
        )),
    }
}
