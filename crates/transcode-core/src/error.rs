//! Error handling for the transcoding library
//!
//! Failures originate at two boundaries only: the perceptual codec engine
//! (session creation, encode, decode) and the session pool (acquire). The
//! companding codec and the frame chunker accept every input and never fail.

#![allow(missing_docs)]

use crate::types::Direction;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for transcoding operations
pub type Result<T> = std::result::Result<T, TranscodeError>;

/// Error type for transcoding operations
#[derive(Error, Debug)]
pub enum TranscodeError {
    /// Invalid configuration value
    #[error("Invalid configuration: {details}")]
    InvalidConfig { details: String },

    /// Invalid sample rate
    #[error("Invalid sample rate: {rate}Hz (supported: {supported:?})")]
    InvalidSampleRate { rate: u32, supported: Vec<u32> },

    /// Invalid channel count
    #[error("Invalid channel count: {channels} (supported: {supported:?})")]
    InvalidChannelCount { channels: u8, supported: Vec<u8> },

    /// Invalid bitrate
    #[error("Invalid bitrate: {bitrate}bps (range: {min}-{max})")]
    InvalidBitrate { bitrate: u32, min: u32, max: u32 },

    /// The engine refused to create a session for the requested configuration
    #[error("Failed to create {direction} session: {reason}")]
    SessionCreation { direction: Direction, reason: String },

    /// The engine returned a negative result from encode or decode
    #[error("Codec {operation} failed with code {code}: {message}")]
    Codec {
        operation: &'static str,
        code: i32,
        message: String,
    },

    /// No session became available before the deadline
    #[error("Timed out after {waited:?} waiting for a codec session")]
    AcquireTimedOut { waited: Duration },

    /// A blocked acquire was cancelled through its token
    #[error("Acquire cancelled before a codec session became available")]
    AcquireCancelled,

    /// The pool was closed before or while waiting
    #[error("Session pool is closed")]
    PoolClosed,

    /// Programming error: wrong direction, foreign lease, double release...
    #[error("API misuse: {details} (this is a bug in the caller)")]
    Misuse { details: String },

    /// I/O operation failed
    #[error("I/O operation failed: {reason}")]
    Io { reason: String },

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {reason}")]
    ConfigParse { reason: String },

    /// An engine broke its calling contract, e.g. reported more output than it had room for
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TranscodeError {
    /// Create a new invalid configuration error
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            details: details.into(),
        }
    }

    /// Create a new session creation error
    pub fn session_creation(direction: Direction, reason: impl Into<String>) -> Self {
        Self::SessionCreation {
            direction,
            reason: reason.into(),
        }
    }

    /// Create a new codec error from an engine result code
    pub fn codec(operation: &'static str, code: i32, message: impl Into<String>) -> Self {
        Self::Codec {
            operation,
            code,
            message: message.into(),
        }
    }

    /// Create a new misuse error
    pub fn misuse(details: impl Into<String>) -> Self {
        Self::Misuse {
            details: details.into(),
        }
    }

    /// Create a new internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if the caller may simply retry or continue with the next chunk
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Codec { .. } | Self::AcquireTimedOut { .. } | Self::AcquireCancelled => true,

            Self::InvalidConfig { .. }
            | Self::InvalidSampleRate { .. }
            | Self::InvalidChannelCount { .. }
            | Self::InvalidBitrate { .. }
            | Self::SessionCreation { .. }
            | Self::PoolClosed
            | Self::Misuse { .. }
            | Self::Io { .. }
            | Self::ConfigParse { .. }
            | Self::Internal { .. } => false,
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig { .. }
            | Self::InvalidSampleRate { .. }
            | Self::InvalidChannelCount { .. }
            | Self::InvalidBitrate { .. }
            | Self::SessionCreation { .. }
            | Self::ConfigParse { .. } => ErrorCategory::Configuration,

            Self::Codec { .. } => ErrorCategory::Codec,

            Self::AcquireTimedOut { .. } | Self::AcquireCancelled | Self::PoolClosed => {
                ErrorCategory::Pool
            }

            Self::Misuse { .. } => ErrorCategory::Misuse,

            Self::Io { .. } => ErrorCategory::Io,

            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Engine result code, if this error came from the engine
    pub fn codec_code(&self) -> Option<i32> {
        match self {
            Self::Codec { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid or unsupported configuration, including session creation
    Configuration,
    /// The perceptual codec rejected a frame or packet
    Codec,
    /// Acquire timed out, was cancelled, or the pool is closed
    Pool,
    /// Caller bug rather than bad input
    Misuse,
    /// I/O related errors
    Io,
    /// Internal library errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Codec => write!(f, "Codec"),
            Self::Pool => write!(f, "Pool"),
            Self::Misuse => write!(f, "Misuse"),
            Self::Io => write!(f, "I/O"),
            Self::Internal => write!(f, "Internal"),
        }
    }
}

/// Convert from I/O errors
impl From<std::io::Error> for TranscodeError {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            reason: error.to_string(),
        }
    }
}

impl From<toml::de::Error> for TranscodeError {
    fn from(error: toml::de::Error) -> Self {
        Self::ConfigParse {
            reason: error.to_string(),
        }
    }
}
