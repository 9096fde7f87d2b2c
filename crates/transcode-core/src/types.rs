//! Core types shared across the library
//!
//! Law kinds, session directions and configurations, and the frame durations
//! accepted by the perceptual codec.

use crate::error::Result;
use crate::utils::validation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sample rates accepted by the perceptual codec
pub const SUPPORTED_SAMPLE_RATES: &[u32] = &[8000, 12000, 16000, 24000, 48000];

/// Channel counts accepted by the perceptual codec
pub const SUPPORTED_CHANNELS: &[u8] = &[1, 2];

/// Target bitrate range of the perceptual codec in bits per second
pub const BITRATE_RANGE: (u32, u32) = (6000, 510_000);

/// Largest scratch buffer a converter reserves for one compressed packet
pub const MAX_PACKET_BYTES: usize = 64 * 1024;

/// G.711 companding law
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LawKind {
    /// A-law (PCMA), even bits toggled on the wire
    #[serde(rename = "alaw", alias = "pcma")]
    ALaw,
    /// μ-law (PCMU), all bits inverted on the wire
    #[serde(rename = "ulaw", alias = "pcmu", alias = "mulaw")]
    MuLaw,
}

impl LawKind {
    /// SDP encoding name
    pub fn name(self) -> &'static str {
        match self {
            Self::ALaw => "PCMA",
            Self::MuLaw => "PCMU",
        }
    }

    /// Static RTP payload type
    pub fn payload_type(self) -> u8 {
        match self {
            Self::ALaw => 8,
            Self::MuLaw => 0,
        }
    }

    /// Code point of the smallest positive level, what a silent line carries
    pub fn silence_byte(self) -> u8 {
        match self {
            Self::ALaw => 0xD5,
            Self::MuLaw => 0xFF,
        }
    }

    /// Width of the quantization interval that `sample` falls into
    pub fn quantization_step(self, sample: i16) -> u16 {
        crate::g711::quantization_step(self, sample)
    }
}

impl fmt::Display for LawKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which way a codec session converts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// PCM frames in, compressed packets out
    Encode,
    /// Compressed packets in, PCM frames out
    Decode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "encoder"),
            Self::Decode => write!(f, "decoder"),
        }
    }
}

/// Perceptual codec application profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationProfile {
    /// Speech-optimized, the telephony default
    #[default]
    Voip,
    /// Music and general audio
    Audio,
    /// Lowest algorithmic delay
    RestrictedLowDelay,
}

/// Frame durations the perceptual codec accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FrameDuration {
    /// 2.5 ms
    #[serde(rename = "2.5ms")]
    Ms2_5,
    /// 5 ms
    #[serde(rename = "5ms")]
    Ms5,
    /// 10 ms
    #[serde(rename = "10ms")]
    Ms10,
    /// 20 ms, the default
    #[default]
    #[serde(rename = "20ms")]
    Ms20,
    /// 40 ms
    #[serde(rename = "40ms")]
    Ms40,
    /// 60 ms
    #[serde(rename = "60ms")]
    Ms60,
}

impl FrameDuration {
    /// All accepted durations, shortest first
    pub const ALL: [FrameDuration; 6] = [
        Self::Ms2_5,
        Self::Ms5,
        Self::Ms10,
        Self::Ms20,
        Self::Ms40,
        Self::Ms60,
    ];

    /// Duration in tenths of a millisecond
    pub fn tenths_ms(self) -> u32 {
        match self {
            Self::Ms2_5 => 25,
            Self::Ms5 => 50,
            Self::Ms10 => 100,
            Self::Ms20 => 200,
            Self::Ms40 => 400,
            Self::Ms60 => 600,
        }
    }

    /// Samples per channel in one frame at `sample_rate`
    ///
    /// Exact for every rate in [`SUPPORTED_SAMPLE_RATES`].
    pub fn samples_per_channel(self, sample_rate: u32) -> usize {
        (u64::from(sample_rate) * u64::from(self.tenths_ms()) / 10_000) as usize
    }

    /// Find the duration whose frame holds `samples_per_channel` samples
    pub fn from_samples(sample_rate: u32, samples_per_channel: usize) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.samples_per_channel(sample_rate) == samples_per_channel)
    }
}

impl fmt::Display for FrameDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ms2_5 => write!(f, "2.5ms"),
            other => write!(f, "{}ms", other.tenths_ms() / 10),
        }
    }
}

/// Pool-unique identifier of a codec session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Parameters a codec session is created with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u8,
    /// Application profile (encoders only)
    pub application: ApplicationProfile,
    /// Target bitrate in bits per second (encoders only)
    pub bitrate: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 8000,
            channels: 1,
            application: ApplicationProfile::Voip,
            bitrate: None,
        }
    }
}

impl SessionConfig {
    /// Create a session configuration
    pub fn new(sample_rate: u32, channels: u8) -> Self {
        Self {
            sample_rate,
            channels,
            ..Default::default()
        }
    }

    /// Set application profile
    pub fn with_application(mut self, application: ApplicationProfile) -> Self {
        self.application = application;
        self
    }

    /// Set target bitrate
    pub fn with_bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_sample_rate(self.sample_rate)?;
        validation::validate_channels(self.channels)?;
        if let Some(bitrate) = self.bitrate {
            validation::validate_bitrate(bitrate)?;
        }
        Ok(())
    }

    /// Largest frame the codec may emit on decode (120 ms), in interleaved samples
    pub fn max_frame_samples(&self) -> usize {
        self.sample_rate as usize * 120 / 1000 * self.channels as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_law_kind_properties() {
        assert_eq!(LawKind::ALaw.name(), "PCMA");
        assert_eq!(LawKind::MuLaw.payload_type(), 0);
        assert_eq!(LawKind::ALaw.silence_byte(), 0xD5);
        assert_eq!(LawKind::MuLaw.silence_byte(), 0xFF);
    }

    #[test]
    fn test_frame_duration_samples() {
        assert_eq!(FrameDuration::Ms20.samples_per_channel(8000), 160);
        assert_eq!(FrameDuration::Ms2_5.samples_per_channel(8000), 20);
        assert_eq!(FrameDuration::Ms60.samples_per_channel(48000), 2880);
        assert_eq!(FrameDuration::from_samples(8000, 160), Some(FrameDuration::Ms20));
        assert_eq!(FrameDuration::from_samples(8000, 161), None);
        assert_eq!(FrameDuration::Ms2_5.to_string(), "2.5ms");
        assert_eq!(FrameDuration::Ms40.to_string(), "40ms");
    }

    #[test]
    fn test_session_config_validation() {
        assert!(SessionConfig::default().validate().is_ok());
        assert!(SessionConfig::new(44100, 1).validate().is_err());
        assert!(SessionConfig::new(8000, 3).validate().is_err());
        assert!(SessionConfig::new(8000, 1).with_bitrate(1000).validate().is_err());
        assert_eq!(SessionConfig::new(8000, 1).max_frame_samples(), 960);
        assert_eq!(SessionConfig::new(48000, 2).max_frame_samples(), 11520);
    }
}
