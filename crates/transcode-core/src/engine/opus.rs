//! Opus engine backed by libopus
//!
//! Requires the `opus` feature and a system libopus.

use super::{NativeErrorCode, PerceptualCodec};
use crate::error::{Result, TranscodeError};
use crate::types::{ApplicationProfile, Direction, SessionConfig};
use opus::{Application, Bitrate, Channels};
use tracing::debug;

/// libopus engine
#[derive(Debug, Clone, Copy, Default)]
pub struct OpusEngine;

impl OpusEngine {
    /// Create the engine
    pub fn new() -> Self {
        Self
    }
}

/// A libopus encoder or decoder
pub enum OpusSession {
    /// Encoder state
    Encoder(opus::Encoder),
    /// Decoder state
    Decoder(opus::Decoder),
}

impl std::fmt::Debug for OpusSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encoder(_) => f.write_str("OpusSession::Encoder"),
            Self::Decoder(_) => f.write_str("OpusSession::Decoder"),
        }
    }
}

fn channels(config: &SessionConfig) -> Channels {
    if config.channels == 2 {
        Channels::Stereo
    } else {
        Channels::Mono
    }
}

fn application(profile: ApplicationProfile) -> Application {
    match profile {
        ApplicationProfile::Voip => Application::Voip,
        ApplicationProfile::Audio => Application::Audio,
        ApplicationProfile::RestrictedLowDelay => Application::LowDelay,
    }
}

fn native_code(error: opus::Error) -> NativeErrorCode {
    NativeErrorCode(error.code() as i32)
}

impl PerceptualCodec for OpusEngine {
    type Session = OpusSession;

    fn name(&self) -> &'static str {
        "opus"
    }

    fn create_encoder(&self, config: &SessionConfig) -> Result<OpusSession> {
        config
            .validate()
            .map_err(|e| TranscodeError::session_creation(Direction::Encode, e.to_string()))?;

        let mut encoder = opus::Encoder::new(
            config.sample_rate,
            channels(config),
            application(config.application),
        )
        .map_err(|e| TranscodeError::session_creation(Direction::Encode, e.to_string()))?;

        if let Some(bitrate) = config.bitrate {
            encoder
                .set_bitrate(Bitrate::Bits(bitrate as i32))
                .map_err(|e| TranscodeError::session_creation(Direction::Encode, e.to_string()))?;
        }

        debug!(
            "Created Opus encoder: {}Hz, {} channel(s), {:?}, bitrate {:?}",
            config.sample_rate, config.channels, config.application, config.bitrate
        );

        Ok(OpusSession::Encoder(encoder))
    }

    fn create_decoder(&self, config: &SessionConfig) -> Result<OpusSession> {
        config
            .validate()
            .map_err(|e| TranscodeError::session_creation(Direction::Decode, e.to_string()))?;

        let decoder = opus::Decoder::new(config.sample_rate, channels(config))
            .map_err(|e| TranscodeError::session_creation(Direction::Decode, e.to_string()))?;

        debug!(
            "Created Opus decoder: {}Hz, {} channel(s)",
            config.sample_rate, config.channels
        );

        Ok(OpusSession::Decoder(decoder))
    }

    fn encode(
        &self,
        session: &mut OpusSession,
        frame: &[i16],
        packet: &mut [u8],
    ) -> std::result::Result<usize, NativeErrorCode> {
        match session {
            OpusSession::Encoder(encoder) => encoder.encode(frame, packet).map_err(native_code),
            OpusSession::Decoder(_) => Err(NativeErrorCode::INVALID_STATE),
        }
    }

    fn decode(
        &self,
        session: &mut OpusSession,
        packet: &[u8],
        pcm: &mut [i16],
    ) -> std::result::Result<usize, NativeErrorCode> {
        match session {
            OpusSession::Decoder(decoder) => decoder.decode(packet, pcm, false).map_err(native_code),
            OpusSession::Encoder(_) => Err(NativeErrorCode::INVALID_STATE),
        }
    }

    fn error_message(&self, code: NativeErrorCode) -> String {
        format!("opus: {}", code.description())
    }
}
