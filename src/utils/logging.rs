//! Logging configuration and progress reporting

use std::str::FromStr;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use crate::domain::errors::DomainError;
use crate::domain::model::{FeederState, PlaybackSource, SessionId};
use crate::error::{CutStreamError, CutStreamResult};
use crate::ports::StreamObserver;

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// General information
    #[default]
    Info,
    /// Debug information
    Debug,
    /// Very verbose debug information
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = CutStreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(CutStreamError::config(format!(
                "Invalid log level: {}. Valid levels: error, warn, info, debug, trace",
                other
            ))),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Pretty,
    /// Compact text format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl FromStr for LogFormat {
    type Err = CutStreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(CutStreamError::config(format!(
                "Invalid log format: {}. Valid formats: pretty, compact, json",
                other
            ))),
        }
    }
}

/// Logging configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
    /// Include target module information
    pub target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            target: false,
        }
    }
}

impl LoggingConfig {
    /// `RUST_LOG` wins over the configured level when set
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_filter()))
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays machine-readable.
pub fn init_logging(config: &LoggingConfig) -> CutStreamResult<()> {
    let builder = fmt()
        .with_env_filter(config.env_filter())
        .with_target(config.target)
        .with_writer(std::io::stderr);

    let result = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    result.map_err(|e| CutStreamError::Logging {
        message: e.to_string(),
    })?;

    tracing::debug!(level = ?config.level, format = ?config.format, "Logging initialized");
    Ok(())
}

/// Progress bar style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStyle {
    /// ASCII progress bar
    Bar,
    /// Percentage only
    Minimal,
}

/// Reports session progress through tracing
pub struct ProgressReporter {
    style: ProgressStyle,
    started: Mutex<Option<Instant>>,
    last_percent: Mutex<Option<u8>>,
}

impl ProgressReporter {
    pub fn new(style: ProgressStyle) -> Self {
        Self {
            style,
            started: Mutex::new(None),
            last_percent: Mutex::new(None),
        }
    }

    /// Render one progress line
    pub fn render(&self, percent: u8) -> String {
        let percent = percent.min(100);
        match self.style {
            ProgressStyle::Bar => {
                let bar_length = 20;
                let filled = percent as usize * bar_length / 100;
                format!(
                    "[{}{}] {:>3}%",
                    "#".repeat(filled),
                    "-".repeat(bar_length - filled),
                    percent
                )
            }
            ProgressStyle::Minimal => format!("{:>3}%", percent),
        }
    }

    fn eta(&self, percent: u8) -> Option<f64> {
        let started = (*self.started.lock())?;
        if percent == 0 || percent >= 100 {
            return None;
        }
        let elapsed = started.elapsed().as_secs_f64();
        Some(elapsed * (100.0 - percent as f64) / percent as f64)
    }
}

impl StreamObserver for ProgressReporter {
    fn on_state(&self, session: SessionId, state: &FeederState) {
        if matches!(state, FeederState::Initializing) {
            *self.started.lock() = Some(Instant::now());
            *self.last_percent.lock() = None;
        }
        tracing::debug!(%session, %state, "Session state changed");
    }

    fn on_progress(&self, session: SessionId, percent: u8) {
        {
            let mut last = self.last_percent.lock();
            if *last == Some(percent) {
                return;
            }
            *last = Some(percent);
        }
        match self.eta(percent) {
            Some(eta) => tracing::info!(%session, "{} (ETA: {:.0}s)", self.render(percent), eta),
            None => tracing::info!(%session, "{}", self.render(percent)),
        }
    }

    fn on_playable(&self, session: SessionId, source: &PlaybackSource) {
        tracing::info!(%session, locator = source.locator(), strategy = %source.strategy(), "Playable");
    }

    fn on_error(&self, session: SessionId, error: &DomainError, retryable: bool) {
        if retryable {
            tracing::warn!(%session, %error, "Playback failed, retry available");
        } else {
            tracing::error!(%session, %error, "Playback failed");
        }
    }
}
