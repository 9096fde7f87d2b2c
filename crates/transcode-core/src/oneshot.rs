//! One-shot conversions
//!
//! Each call builds a single-session pool, converts the whole input and tears
//! everything down again. Handy for tools and tests; long-lived streams
//! should hold a [`StreamingConverter`] over a shared pool instead.
//!
//! ```rust
//! # #[cfg(feature = "sim")]
//! # fn main() -> transcode_core::Result<()> {
//! use transcode_core::engine::sim::SimCodec;
//! use transcode_core::oneshot::Conversion;
//!
//! let packets = Conversion::from_alaw(&[0xD5; 320])
//!     .with_bitrate(24_000)
//!     .encode(SimCodec::new())?;
//! assert!(!packets.is_empty());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sim"))]
//! # fn main() {}
//! ```

use crate::config::TranscodeConfig;
use crate::converter::StreamingConverter;
use crate::engine::PerceptualCodec;
use crate::error::Result;
use crate::frame::RemainderPolicy;
use crate::pool::SessionPool;
use crate::types::{FrameDuration, LawKind};
use std::sync::Arc;
use tracing::debug;

/// Encode a whole buffer of law bytes into concatenated packets
pub fn g711_to_compressed<C: PerceptualCodec>(
    codec: C,
    law: &[u8],
    config: &TranscodeConfig,
) -> Result<Vec<u8>> {
    let pool = SessionPool::encoders(Arc::new(codec), config.session_config(), 1)?;
    let mut converter = StreamingConverter::open(&pool, config)?;
    let packets = converter.encode_chunk(law)?;
    converter.close();
    pool.close();
    debug!("One-shot encode: {} law bytes → {} packet bytes", law.len(), packets.len());
    Ok(packets)
}

/// Decode a packet sequence into law bytes
pub fn compressed_to_g711<C, I, P>(
    codec: C,
    packets: I,
    config: &TranscodeConfig,
) -> Result<Vec<u8>>
where
    C: PerceptualCodec,
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let pool = SessionPool::decoders(Arc::new(codec), config.session_config(), 1)?;
    let mut converter = StreamingConverter::open(&pool, config)?;
    let law = converter.decode_packets(packets)?;
    converter.close();
    pool.close();
    debug!("One-shot decode: {} law bytes", law.len());
    Ok(law)
}

#[derive(Debug, Clone, Copy)]
enum Input<'a> {
    Law(&'a [u8]),
    Pcm(&'a [i16]),
}

/// Builder for a one-shot encode
#[derive(Debug, Clone)]
pub struct Conversion<'a> {
    input: Input<'a>,
    config: TranscodeConfig,
}

impl<'a> Conversion<'a> {
    /// Start from A-law bytes at 8 kHz mono
    pub fn from_alaw(data: &'a [u8]) -> Self {
        Self {
            input: Input::Law(data),
            config: TranscodeConfig::new().with_law(LawKind::ALaw),
        }
    }

    /// Start from u-law bytes at 8 kHz mono
    pub fn from_ulaw(data: &'a [u8]) -> Self {
        Self {
            input: Input::Law(data),
            config: TranscodeConfig::new().with_law(LawKind::MuLaw),
        }
    }

    /// Start from interleaved PCM
    pub fn from_pcm(samples: &'a [i16], sample_rate: u32, channels: u8) -> Self {
        Self {
            input: Input::Pcm(samples),
            config: TranscodeConfig::new()
                .with_sample_rate(sample_rate)
                .with_channels(channels),
        }
    }

    /// Set sample rate
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Set encoder bitrate
    pub fn with_bitrate(mut self, bitrate: u32) -> Self {
        self.config.bitrate = Some(bitrate);
        self
    }

    /// Set frame duration
    pub fn with_frame_duration(mut self, frame_duration: FrameDuration) -> Self {
        self.config.frame_duration = frame_duration;
        self
    }

    /// Set remainder policy
    pub fn with_remainder_policy(mut self, remainder: RemainderPolicy) -> Self {
        self.config.remainder = remainder;
        self
    }

    /// Configuration the conversion will run with
    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }

    /// Run the conversion, returning concatenated packets
    pub fn encode<C: PerceptualCodec>(self, codec: C) -> Result<Vec<u8>> {
        match self.input {
            Input::Law(data) => g711_to_compressed(codec, data, &self.config),
            Input::Pcm(samples) => {
                let pool = SessionPool::encoders(Arc::new(codec), self.config.session_config(), 1)?;
                let mut converter = StreamingConverter::open(&pool, &self.config)?;
                let packets = converter.encode_pcm(samples)?;
                converter.close();
                pool.close();
                Ok(packets)
            }
        }
    }
}
