//! Transcoding configuration
//!
//! [`TranscodeConfig`] gathers everything a converter and its pool need. It
//! can be built fluently, loaded from TOML, and is checked by
//! [`TranscodeConfig::validate`] before use.
//!
//! ```toml
//! sample_rate = 8000
//! channels = 1
//! law = "alaw"
//! bitrate = 16000
//! frame_duration = "20ms"
//! remainder = "drop"
//! application = "voip"
//! pool_capacity = 4
//! max_packet_bytes = 4000
//! transfer = "borrowed"
//! ```

use crate::error::{Result, TranscodeError};
use crate::frame::{FrameChunker, RemainderPolicy};
use crate::transfer::TransferMode;
use crate::types::{ApplicationProfile, FrameDuration, LawKind, SessionConfig};
use crate::utils::validation;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default target bitrate in bits per second
pub const DEFAULT_BITRATE: u32 = 16_000;

/// Default scratch size for one compressed packet
pub const DEFAULT_MAX_PACKET_BYTES: usize = 4000;

/// Default number of sessions per pool
pub const DEFAULT_POOL_CAPACITY: usize = 4;

/// Configuration of a transcoding pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u8,
    /// Companding law of the law-byte side
    pub law: LawKind,
    /// Encoder target bitrate in bits per second
    pub bitrate: Option<u32>,
    /// Duration of each codec frame
    pub frame_duration: FrameDuration,
    /// Handling of samples that do not fill a frame
    pub remainder: RemainderPolicy,
    /// Encoder application profile
    pub application: ApplicationProfile,
    /// Sessions per pool
    pub pool_capacity: usize,
    /// Scratch size reserved for one compressed packet, at most
    /// [`MAX_PACKET_BYTES`](crate::types::MAX_PACKET_BYTES)
    pub max_packet_bytes: usize,
    /// Give up acquiring a session after this many milliseconds
    pub acquire_timeout_ms: Option<u64>,
    /// How buffers reach the engine
    pub transfer: TransferMode,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            sample_rate: 8000,
            channels: 1,
            law: LawKind::ALaw,
            bitrate: Some(DEFAULT_BITRATE),
            frame_duration: FrameDuration::Ms20,
            remainder: RemainderPolicy::Drop,
            application: ApplicationProfile::Voip,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            max_packet_bytes: DEFAULT_MAX_PACKET_BYTES,
            acquire_timeout_ms: None,
            transfer: TransferMode::Borrowed,
        }
    }
}

impl TranscodeConfig {
    /// Create the default configuration: 8 kHz mono A-law, 20 ms frames
    pub fn new() -> Self {
        Self::default()
    }

    /// Set sample rate
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set channel count
    pub fn with_channels(mut self, channels: u8) -> Self {
        self.channels = channels;
        self
    }

    /// Set companding law
    pub fn with_law(mut self, law: LawKind) -> Self {
        self.law = law;
        self
    }

    /// Set encoder bitrate
    pub fn with_bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Leave the bitrate to the engine
    pub fn with_engine_bitrate(mut self) -> Self {
        self.bitrate = None;
        self
    }

    /// Set frame duration
    pub fn with_frame_duration(mut self, frame_duration: FrameDuration) -> Self {
        self.frame_duration = frame_duration;
        self
    }

    /// Set remainder policy
    pub fn with_remainder_policy(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }

    /// Set application profile
    pub fn with_application(mut self, application: ApplicationProfile) -> Self {
        self.application = application;
        self
    }

    /// Set pool capacity
    pub fn with_pool_capacity(mut self, pool_capacity: usize) -> Self {
        self.pool_capacity = pool_capacity;
        self
    }

    /// Set packet scratch size
    pub fn with_max_packet_bytes(mut self, max_packet_bytes: usize) -> Self {
        self.max_packet_bytes = max_packet_bytes;
        self
    }

    /// Set acquire timeout
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Set transfer mode
    pub fn with_transfer_mode(mut self, transfer: TransferMode) -> Self {
        self.transfer = transfer;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.session_config().validate()?;
        validation::validate_capacity(self.pool_capacity)?;
        validation::validate_packet_size(self.max_packet_bytes)?;
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let document = std::fs::read_to_string(path)?;
        Self::from_toml_str(&document)
    }

    /// Render as a TOML document
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| TranscodeError::ConfigParse {
            reason: e.to_string(),
        })
    }

    /// Parameters for the sessions of a pool
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            sample_rate: self.sample_rate,
            channels: self.channels,
            application: self.application,
            bitrate: self.bitrate,
        }
    }

    /// Interleaved samples per codec frame
    pub fn frame_len(&self) -> usize {
        self.frame_duration.samples_per_channel(self.sample_rate) * usize::from(self.channels)
    }

    /// Chunker for this frame shape
    pub fn frame_chunker(&self) -> Result<FrameChunker> {
        FrameChunker::for_format(
            self.sample_rate,
            self.channels,
            self.frame_duration,
            self.remainder,
        )
    }

    /// Acquire timeout, if any
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }
}
