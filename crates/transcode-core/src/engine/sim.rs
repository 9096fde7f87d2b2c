//! Simulated perceptual codec
//!
//! A deterministic stand-in for the native codec with the same calling
//! contract: frames must have one of the accepted durations, output buffers
//! must be large enough, decoders conceal a lost frame when handed an empty
//! packet, and failures are reported with libopus result codes.
//!
//! Packet layout:
//!
//! ```text
//! +---------------------+----------+----------------------------+
//! | samples/channel u16 | channels | one byte per sample (MSBs) |
//! +---------------------+----------+----------------------------+
//! ```

use super::{NativeErrorCode, PerceptualCodec};
use crate::error::{Result, TranscodeError};
use crate::types::{Direction, FrameDuration, SessionConfig};
use tracing::trace;

/// Size of the packet header in bytes
pub const SIM_HEADER_LEN: usize = 3;

/// Simulated engine
#[derive(Debug, Clone, Copy, Default)]
pub struct SimCodec;

impl SimCodec {
    /// Create the engine
    pub fn new() -> Self {
        Self
    }

    /// Packet size for a frame of `samples` interleaved samples
    pub fn packet_len(samples: usize) -> usize {
        SIM_HEADER_LEN + samples
    }

    fn create(&self, direction: Direction, config: &SessionConfig) -> Result<SimSession> {
        config
            .validate()
            .map_err(|e| TranscodeError::session_creation(direction, e.to_string()))?;

        trace!(
            "Created simulated {} session: {}Hz, {} channel(s)",
            direction,
            config.sample_rate,
            config.channels
        );

        Ok(SimSession {
            direction,
            sample_rate: config.sample_rate,
            channels: config.channels,
            frames: 0,
            last_frame_len: FrameDuration::default().samples_per_channel(config.sample_rate),
        })
    }
}

/// State of one simulated session
#[derive(Debug)]
pub struct SimSession {
    direction: Direction,
    sample_rate: u32,
    channels: u8,
    frames: u64,
    last_frame_len: usize,
}

impl SimSession {
    /// Direction the session was created for
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Frames encoded or decoded so far
    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    fn frame_duration(&self, samples_per_channel: usize) -> Option<FrameDuration> {
        FrameDuration::from_samples(self.sample_rate, samples_per_channel)
    }
}

impl PerceptualCodec for SimCodec {
    type Session = SimSession;

    fn name(&self) -> &'static str {
        "sim"
    }

    fn create_encoder(&self, config: &SessionConfig) -> Result<SimSession> {
        self.create(Direction::Encode, config)
    }

    fn create_decoder(&self, config: &SessionConfig) -> Result<SimSession> {
        self.create(Direction::Decode, config)
    }

    fn encode(
        &self,
        session: &mut SimSession,
        frame: &[i16],
        packet: &mut [u8],
    ) -> std::result::Result<usize, NativeErrorCode> {
        if session.direction != Direction::Encode {
            return Err(NativeErrorCode::INVALID_STATE);
        }

        let channels = usize::from(session.channels);
        if frame.len() % channels != 0 {
            return Err(NativeErrorCode::BAD_ARG);
        }
        let per_channel = frame.len() / channels;
        if session.frame_duration(per_channel).is_none() {
            return Err(NativeErrorCode::BAD_ARG);
        }

        let needed = SimCodec::packet_len(frame.len());
        if packet.len() < needed {
            return Err(NativeErrorCode::BUFFER_TOO_SMALL);
        }

        packet[..2].copy_from_slice(&(per_channel as u16).to_le_bytes());
        packet[2] = session.channels;
        for (out, &sample) in packet[SIM_HEADER_LEN..needed].iter_mut().zip(frame) {
            *out = (sample >> 8) as u8;
        }

        session.frames += 1;
        Ok(needed)
    }

    fn decode(
        &self,
        session: &mut SimSession,
        packet: &[u8],
        pcm: &mut [i16],
    ) -> std::result::Result<usize, NativeErrorCode> {
        if session.direction != Direction::Decode {
            return Err(NativeErrorCode::INVALID_STATE);
        }

        let channels = usize::from(session.channels);

        // Loss concealment: repeat the last frame length as silence
        if packet.is_empty() {
            let samples = session.last_frame_len * channels;
            if pcm.len() < samples {
                return Err(NativeErrorCode::BUFFER_TOO_SMALL);
            }
            pcm[..samples].fill(0);
            session.frames += 1;
            return Ok(session.last_frame_len);
        }

        if packet.len() < SIM_HEADER_LEN || usize::from(packet[2]) != channels {
            return Err(NativeErrorCode::INVALID_PACKET);
        }

        let per_channel = usize::from(u16::from_le_bytes([packet[0], packet[1]]));
        let samples = per_channel * channels;
        let body = &packet[SIM_HEADER_LEN..];
        if body.len() != samples || session.frame_duration(per_channel).is_none() {
            return Err(NativeErrorCode::INVALID_PACKET);
        }
        if pcm.len() < samples {
            return Err(NativeErrorCode::BUFFER_TOO_SMALL);
        }

        for (out, &byte) in pcm[..samples].iter_mut().zip(body) {
            *out = i16::from(byte as i8) << 8;
        }

        session.last_frame_len = per_channel;
        session.frames += 1;
        Ok(per_channel)
    }

    fn error_message(&self, code: NativeErrorCode) -> String {
        format!("sim: {}", code.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono() -> SessionConfig {
        SessionConfig::new(8000, 1)
    }

    #[test]
    fn test_encode_decode_frame() {
        let codec = SimCodec::new();
        let mut encoder = codec.create_encoder(&mono()).unwrap();
        let mut decoder = codec.create_decoder(&mono()).unwrap();

        let frame: Vec<i16> = (0..160).map(|i| (i * 200 - 16000) as i16).collect();
        let mut packet = [0u8; 4000];
        let len = codec.encode(&mut encoder, &frame, &mut packet).unwrap();
        assert_eq!(len, SimCodec::packet_len(160));

        let mut pcm = [0i16; 960];
        let decoded = codec.decode(&mut decoder, &packet[..len], &mut pcm).unwrap();
        assert_eq!(decoded, 160);
        for (orig, out) in frame.iter().zip(&pcm[..160]) {
            assert!((orig - out).abs() < 256);
        }
        assert_eq!(encoder.frames_processed(), 1);
        assert_eq!(decoder.frames_processed(), 1);
    }

    #[test]
    fn test_rejects_invalid_frame_size() {
        let codec = SimCodec::new();
        let mut encoder = codec.create_encoder(&mono()).unwrap();
        let mut packet = [0u8; 4000];
        assert_eq!(
            codec.encode(&mut encoder, &[0i16; 100], &mut packet),
            Err(NativeErrorCode::BAD_ARG)
        );
        assert_eq!(
            codec.encode(&mut encoder, &[0i16; 160], &mut packet[..10]),
            Err(NativeErrorCode::BUFFER_TOO_SMALL)
        );
    }

    #[test]
    fn test_rejects_corrupted_packet() {
        let codec = SimCodec::new();
        let mut decoder = codec.create_decoder(&mono()).unwrap();
        let mut pcm = [0i16; 960];
        assert_eq!(
            codec.decode(&mut decoder, &[1, 2], &mut pcm),
            Err(NativeErrorCode::INVALID_PACKET)
        );
        assert_eq!(
            codec.decode(&mut decoder, &[160, 0, 1, 0, 0], &mut pcm),
            Err(NativeErrorCode::INVALID_PACKET)
        );
    }

    #[test]
    fn test_empty_packet_conceals_last_frame() {
        let codec = SimCodec::new();
        let mut decoder = codec.create_decoder(&mono()).unwrap();
        let mut pcm = [7i16; 960];
        assert_eq!(codec.decode(&mut decoder, &[], &mut pcm), Ok(160));
        assert!(pcm[..160].iter().all(|&s| s == 0));
        assert_eq!(pcm[160], 7);
    }

    #[test]
    fn test_wrong_direction() {
        let codec = SimCodec::new();
        let mut decoder = codec.create_decoder(&mono()).unwrap();
        let mut packet = [0u8; 4000];
        assert_eq!(
            codec.encode(&mut decoder, &[0i16; 160], &mut packet),
            Err(NativeErrorCode::INVALID_STATE)
        );
    }

    #[test]
    fn test_create_rejects_bad_config() {
        let codec = SimCodec::new();
        let err = codec.create_encoder(&SessionConfig::new(44100, 1)).unwrap_err();
        assert!(matches!(
            err,
            TranscodeError::SessionCreation {
                direction: Direction::Encode,
                ..
            }
        ));
    }
}
