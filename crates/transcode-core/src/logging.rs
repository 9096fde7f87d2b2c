//! Logging setup
//!
//! The library itself only emits `tracing` events. Applications and tests
//! that want them printed can install the fmt subscriber configured here.

use crate::error::{Result, TranscodeError};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

/// Configuration for the fmt subscriber
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level, overridden per target by `RUST_LOG`
    pub level: Level,
    /// Whether to include file and line information
    pub file_info: bool,
    /// Whether to log span activity
    pub log_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: Level::INFO,
            file_info: false,
            log_spans: false,
        }
    }
}

impl LoggingConfig {
    /// Create a logging configuration at `level`
    pub fn new(level: Level) -> Self {
        LoggingConfig {
            level,
            ..Default::default()
        }
    }

    /// Include file and line information
    pub fn with_file_info(mut self, enabled: bool) -> Self {
        self.file_info = enabled;
        self
    }

    /// Log span activity
    pub fn with_spans(mut self, enabled: bool) -> Self {
        self.log_spans = enabled;
        self
    }
}

/// Install a global fmt subscriber
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let span_events = if config.log_spans {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    };

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(span_events)
        .with_file(config.file_info)
        .with_line_number(config.file_info)
        .try_init()
        .is_ok()
}

/// Parse a log level from a string
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level)
        .map_err(|_| TranscodeError::invalid_config(format!("Invalid log level: {}", level)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level("WARN").unwrap(), Level::WARN);
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LoggingConfig::new(Level::DEBUG).with_file_info(true);
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
