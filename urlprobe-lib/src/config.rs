//! Configuration file parsing and environment variables.
//!
//! This module handles loading defaults from TOML files and `UP_*`
//! environment variables, and merging config files with proper precedence.
//! The CLI applies its own flags on top.

use crate::error::ProbeError;
use crate::utils::parse_duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Default number of concurrent workers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Run unrestricted by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrestricted: Option<bool>,

    /// Default request timeout (as string, e.g., "5s", "500ms")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Default verbose logging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    /// Interval between periodic reports (e.g., "10s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_interval: Option<String>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which config files were found
    pub verbose: bool,
}

impl ConfigManager {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// `FileError` when the file is missing or unreadable, `ConfigError`
    /// when it is not valid TOML or holds invalid values.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ProbeError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ProbeError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ProbeError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            ProbeError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config < home config < local config; later files win per field.
    pub fn discover_and_load(&self) -> Result<FileConfig, ProbeError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            let config = self.load_file(&path)?;
            merged_config = self.merge_configs(merged_config, config);
            loaded_files.push(path);
        }

        if self.verbose {
            for path in &loaded_files {
                info!("Loaded config file {}", path.display());
            }
        }

        Ok(merged_config)
    }

    /// Looks for configuration files in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./urlprobe.toml", "./.urlprobe.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Looks for configuration files in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".urlprobe.toml", "urlprobe.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("urlprobe").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` take precedence.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower_defaults), Some(higher_defaults)) => Some(DefaultsConfig {
                    concurrency: higher_defaults.concurrency.or(lower_defaults.concurrency),
                    unrestricted: higher_defaults.unrestricted.or(lower_defaults.unrestricted),
                    timeout: higher_defaults.timeout.or(lower_defaults.timeout),
                    verbose: higher_defaults.verbose.or(lower_defaults.verbose),
                    report_interval: higher_defaults
                        .report_interval
                        .or(lower_defaults.report_interval),
                }),
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), ProbeError> {
        let Some(defaults) = &config.defaults else {
            return Ok(());
        };

        if defaults.concurrency == Some(0) {
            return Err(ProbeError::config(
                "Concurrency must be greater than zero",
            ));
        }

        for (key, value) in [
            ("timeout", &defaults.timeout),
            ("report_interval", &defaults.report_interval),
        ] {
            if let Some(raw) = value {
                match parse_duration(raw) {
                    Some(d) if !d.is_zero() => {}
                    _ => {
                        return Err(ProbeError::config(format!(
                            "Invalid {} '{}'. Use format like '500ms', '5s', '2m'",
                            key, raw
                        )))
                    }
                }
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// Values come from the `UP_*` variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub unrestricted: Option<bool>,
    pub timeout: Option<String>,
    pub verbose: Option<bool>,
    pub file: Option<String>,
    pub config: Option<String>,
}

/// Load configuration from the process environment.
///
/// Invalid values are ignored (with a warning when `verbose`).
pub fn load_env_config(verbose: bool) -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok(), verbose)
}

/// Load configuration through an arbitrary variable lookup.
pub(crate) fn load_env_config_from<F>(lookup: F, verbose: bool) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    // UP_CONCURRENCY - number of concurrent workers
    if let Some(val) = lookup("UP_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if concurrency > 0 => env_config.concurrency = Some(concurrency),
            _ => {
                if verbose {
                    warn!("Invalid UP_CONCURRENCY='{}', must be a positive integer", val);
                }
            }
        }
    }

    // UP_UNRESTRICTED - spawn a task per URL
    if let Some(val) = lookup("UP_UNRESTRICTED") {
        env_config.unrestricted = parse_bool_var("UP_UNRESTRICTED", &val, verbose);
    }

    // UP_TIMEOUT - request timeout
    if let Some(timeout_str) = lookup("UP_TIMEOUT") {
        if parse_duration(&timeout_str).is_some_and(|d| !d.is_zero()) {
            env_config.timeout = Some(timeout_str);
        } else if verbose {
            warn!(
                "Invalid UP_TIMEOUT='{}', use format like '500ms', '5s', '2m'",
                timeout_str
            );
        }
    }

    // UP_VERBOSE - per-failure logging
    if let Some(val) = lookup("UP_VERBOSE") {
        env_config.verbose = parse_bool_var("UP_VERBOSE", &val, verbose);
    }

    // UP_FILE - default URL list
    if let Some(file_path) = lookup("UP_FILE") {
        if !file_path.trim().is_empty() {
            env_config.file = Some(file_path);
        }
    }

    // UP_CONFIG - default config file
    if let Some(config_path) = lookup("UP_CONFIG") {
        if !config_path.trim().is_empty() {
            env_config.config = Some(config_path);
        }
    }

    env_config
}

fn parse_bool_var(name: &str, val: &str, verbose: bool) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            if verbose {
                warn!("Invalid {}='{}', use true/false", name, val);
            }
            None
        }
    }
}
