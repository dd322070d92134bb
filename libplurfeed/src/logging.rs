//! Logging setup for programs embedding the engine
//!
//! The engine itself only emits `tracing` events: one `warn!` per isolated
//! platform failure, `info!` per aggregation pass and `debug!` per outbound
//! request. This module installs a subscriber that writes them to stderr.
//!
//! # Examples
//!
//! ```no_run
//! use libplurfeed::logging::{LogFormat, LoggingConfig};
//!
//! LoggingConfig::new(LogFormat::Json, "libplurfeed=debug".to_string(), false).init();
//!
//! // Or honour PLURFEED_LOG_FORMAT / PLURFEED_LOG_LEVEL
//! libplurfeed::logging::init_default();
//! ```

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

const FORMAT_VAR: &str = "PLURFEED_LOG_FORMAT";
const LEVEL_VAR: &str = "PLURFEED_LOG_LEVEL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Plain text without colors
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// Multi-line with colors, for development
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `info` or `libplurfeed=debug`
    pub level: String,
    /// Force `debug` regardless of `level`
    pub verbose: bool,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
        }
    }

    /// Settings from `PLURFEED_LOG_FORMAT` and `PLURFEED_LOG_LEVEL`
    ///
    /// Unset or unparsable values fall back to text at `info`.
    pub fn from_env() -> Self {
        let format = std::env::var(FORMAT_VAR)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let level = std::env::var(LEVEL_VAR).unwrap_or_else(|_| "info".to_string());

        Self::new(format, level, false)
    }

    fn filter(&self) -> EnvFilter {
        let directive = if self.verbose { "debug" } else { self.level.as_str() };
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(directive))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Install the global subscriber
    ///
    /// Returns `false` if a subscriber was already installed; the existing
    /// one stays in place.
    pub fn init(&self) -> bool {
        let filter = self.filter();

        let installed = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .flatten_event(true)
                .with_target(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false)
                .try_init(),
        };

        installed.is_ok()
    }
}

/// Install a subscriber configured from the environment
pub fn init_default() -> bool {
    LoggingConfig::from_env().init()
}
