//! Streaming conversion over a leased codec session
//!
//! A [`StreamingConverter`] holds one [`SessionLease`] for its whole life and
//! converts a long sequence of chunks in one direction:
//!
//! - encode: law bytes → PCM → frames → one engine call per frame → packets
//! - decode: packet → one engine call → PCM → law bytes
//!
//! Scratch buffers for PCM, packets and decoded frames are allocated once and
//! reused for every chunk. A failed engine call aborts the chunk and no
//! partial output is returned; the converter stays usable for the next chunk.
//! The lease goes back to its pool on [`StreamingConverter::close`] or drop.

use crate::config::TranscodeConfig;
use crate::engine::{NativeErrorCode, PerceptualCodec};
use crate::error::{Result, TranscodeError};
use crate::frame::{self, FrameChunker};
use crate::g711;
use crate::pool::{SessionLease, SessionPool};
use crate::transfer::{self, TransferMode};
use crate::types::{Direction, LawKind, SessionId};
use bytes::Bytes;
use tracing::{debug, warn};

/// Running totals of one converter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConverterStats {
    /// Chunks converted successfully
    pub chunks: u64,
    /// Frames handed to the engine successfully
    pub frames: u64,
    /// Bytes received by successful calls
    pub input_bytes: u64,
    /// Bytes returned by successful calls
    pub output_bytes: u64,
    /// Chunks aborted by an engine error
    pub failed_chunks: u64,
}

/// Converts a stream of same-direction chunks through one leased session
pub struct StreamingConverter<C: PerceptualCodec> {
    lease: SessionLease<C>,
    law: LawKind,
    chunker: FrameChunker,
    transfer: TransferMode,
    /// Decoded law input, or decoded frames awaiting companding
    pcm: Vec<i16>,
    /// One compressed packet
    packet: Vec<u8>,
    /// One decoded frame, sized for the longest frame the engine may emit
    frame: Vec<i16>,
    stats: ConverterStats,
}

impl<C: PerceptualCodec> StreamingConverter<C> {
    /// Wrap a lease
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid, or a misuse
    /// error if the leased session was created for another sample rate or
    /// channel count.
    pub fn new(lease: SessionLease<C>, config: &TranscodeConfig) -> Result<Self> {
        config.validate()?;

        let session = lease.config();
        if session.sample_rate != config.sample_rate || session.channels != config.channels {
            return Err(TranscodeError::misuse(format!(
                "{} was created for {}Hz/{}ch but the converter is configured for {}Hz/{}ch",
                lease.id(),
                session.sample_rate,
                session.channels,
                config.sample_rate,
                config.channels
            )));
        }

        let chunker = config.frame_chunker()?;
        let max_frame = session.max_frame_samples();

        debug!(
            "Opened {} converter on {}: {} {}, {}-sample frames",
            lease.direction(),
            lease.id(),
            config.law,
            config.frame_duration,
            chunker.frame_len()
        );

        Ok(Self {
            law: config.law,
            chunker,
            transfer: config.transfer,
            pcm: Vec::with_capacity(chunker.frame_len()),
            packet: vec![0u8; config.max_packet_bytes],
            frame: vec![0i16; max_frame],
            stats: ConverterStats::default(),
            lease,
        })
    }

    /// Acquire a session from `pool` and wrap it
    ///
    /// Honors the configured acquire timeout.
    pub fn open(pool: &SessionPool<C>, config: &TranscodeConfig) -> Result<Self> {
        let lease = pool.acquire_with(config.acquire_timeout(), None)?;
        Self::new(lease, config)
    }

    /// Direction of the leased session
    pub fn direction(&self) -> Direction {
        self.lease.direction()
    }

    /// Identifier of the leased session
    pub fn session_id(&self) -> SessionId {
        self.lease.id()
    }

    /// Companding law of the law-byte side
    pub fn law(&self) -> LawKind {
        self.law
    }

    /// Interleaved samples per frame
    pub fn frame_len(&self) -> usize {
        self.chunker.frame_len()
    }

    /// Totals so far
    pub fn stats(&self) -> ConverterStats {
        self.stats
    }

    fn ensure_direction(&self, expected: Direction, operation: &str) -> Result<()> {
        let actual = self.lease.direction();
        if actual != expected {
            warn!("{} called on a converter holding a {}", operation, actual);
            return Err(TranscodeError::misuse(format!(
                "{} requires a {} session but the converter holds a {}",
                operation, expected, actual
            )));
        }
        Ok(())
    }

    fn record(&mut self, outcome: Option<(usize, usize)>, input_bytes: usize) {
        match outcome {
            Some((frames, output_bytes)) => {
                self.stats.chunks += 1;
                self.stats.frames += frames as u64;
                self.stats.input_bytes += input_bytes as u64;
                self.stats.output_bytes += output_bytes as u64;
            }
            None => self.stats.failed_chunks += 1,
        }
    }

    /// Encode a chunk of law bytes into concatenated packets
    ///
    /// Samples that do not fill a frame are handled by the configured
    /// remainder policy.
    pub fn encode_chunk(&mut self, law: &[u8]) -> Result<Vec<u8>> {
        self.ensure_direction(Direction::Encode, "encode_chunk")?;
        g711::decode_into_vec(law, self.law, &mut self.pcm);

        let mut out = Vec::new();
        let result = encode_frames(
            &mut self.lease,
            &self.chunker,
            self.transfer,
            &self.pcm,
            &mut self.packet,
            |packet| out.extend_from_slice(packet),
        );

        self.record(result.as_ref().ok().map(|&frames| (frames, out.len())), law.len());
        let frames = result?;
        debug!(
            "Encoded {} law bytes into {} frame(s), {} packet bytes",
            law.len(),
            frames,
            out.len()
        );
        Ok(out)
    }

    /// Encode a chunk of law bytes into one packet per frame
    pub fn encode_chunk_packets(&mut self, law: &[u8]) -> Result<Vec<Bytes>> {
        self.ensure_direction(Direction::Encode, "encode_chunk_packets")?;
        g711::decode_into_vec(law, self.law, &mut self.pcm);

        let mut packets = Vec::with_capacity(self.chunker.frame_count(self.pcm.len()));
        let mut total = 0;
        let result = encode_frames(
            &mut self.lease,
            &self.chunker,
            self.transfer,
            &self.pcm,
            &mut self.packet,
            |packet| {
                total += packet.len();
                packets.push(Bytes::copy_from_slice(packet));
            },
        );

        self.record(result.as_ref().ok().map(|&frames| (frames, total)), law.len());
        result?;
        debug!("Encoded {} law bytes into {} packet(s)", law.len(), packets.len());
        Ok(packets)
    }

    /// Encode interleaved PCM into concatenated packets
    ///
    /// Frames are borrowed straight from `pcm`.
    pub fn encode_pcm(&mut self, pcm: &[i16]) -> Result<Vec<u8>> {
        self.ensure_direction(Direction::Encode, "encode_pcm")?;

        let mut out = Vec::new();
        let result = encode_frames(
            &mut self.lease,
            &self.chunker,
            self.transfer,
            pcm,
            &mut self.packet,
            |packet| out.extend_from_slice(packet),
        );

        self.record(result.as_ref().ok().map(|&frames| (frames, out.len())), pcm.len() * 2);
        result?;
        debug!("Encoded {} PCM samples into {} packet bytes", pcm.len(), out.len());
        Ok(out)
    }

    /// Encode little-endian PCM bytes into concatenated packets
    ///
    /// On little-endian targets an aligned buffer is viewed in place as
    /// samples; otherwise the samples are assembled into scratch first. A
    /// trailing odd byte is ignored.
    pub fn encode_pcm_bytes(&mut self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.ensure_direction(Direction::Encode, "encode_pcm_bytes")?;
        let even = &bytes[..bytes.len() & !1];

        let borrowed: Option<&[i16]> = if cfg!(target_endian = "little") {
            bytemuck::try_cast_slice(even).ok()
        } else {
            None
        };
        let pcm = match borrowed {
            Some(samples) => samples,
            None => {
                self.pcm.clear();
                self.pcm.extend(
                    even.chunks_exact(2)
                        .map(|pair| i16::from_le_bytes([pair[0], pair[1]])),
                );
                &self.pcm
            }
        };

        let mut out = Vec::new();
        let result = encode_frames(
            &mut self.lease,
            &self.chunker,
            self.transfer,
            pcm,
            &mut self.packet,
            |packet| out.extend_from_slice(packet),
        );

        self.record(result.as_ref().ok().map(|&frames| (frames, out.len())), bytes.len());
        result?;
        Ok(out)
    }

    /// Decode one packet into law bytes
    pub fn decode_chunk(&mut self, packet: &[u8]) -> Result<Vec<u8>> {
        self.ensure_direction(Direction::Decode, "decode_chunk")?;

        let result = self.decode_frame(packet);
        self.record(result.as_ref().ok().map(|&samples| (1, samples)), packet.len());
        let samples = result?;

        let law = g711::encode_to_vec(&self.frame[..samples], self.law);
        debug!("Decoded {} packet bytes into {} law bytes", packet.len(), law.len());
        Ok(law)
    }

    /// Decode one packet into interleaved PCM
    pub fn decode_pcm(&mut self, packet: &[u8]) -> Result<Vec<i16>> {
        self.ensure_direction(Direction::Decode, "decode_pcm")?;

        let result = self.decode_frame(packet);
        self.record(result.as_ref().ok().map(|&samples| (1, samples * 2)), packet.len());
        let samples = result?;
        Ok(self.frame[..samples].to_vec())
    }

    /// Decode a packet sequence and join the frames into law bytes
    ///
    /// Fails as a whole if any packet fails.
    pub fn decode_packets<I, P>(&mut self, packets: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        self.ensure_direction(Direction::Decode, "decode_packets")?;

        self.pcm.clear();
        let mut frames = 0;
        let mut input_bytes = 0;
        let mut result = Ok(());
        for packet in packets {
            let packet = packet.as_ref();
            input_bytes += packet.len();
            match self.decode_frame(packet) {
                Ok(samples) => {
                    frame::join_into([&self.frame[..samples]], &mut self.pcm);
                    frames += 1;
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        self.record(result.as_ref().ok().map(|()| (frames, self.pcm.len())), input_bytes);
        result?;

        let law = g711::encode_to_vec(&self.pcm, self.law);
        debug!("Decoded {} packet(s) into {} law bytes", frames, law.len());
        Ok(law)
    }

    /// Run the engine on one packet, returning interleaved samples in `frame`
    fn decode_frame(&mut self, packet: &[u8]) -> Result<usize> {
        let channels = usize::from(self.lease.config().channels);
        let (codec, session) = self.lease.parts_mut();

        let per_channel = transfer::decode_packet(self.transfer, codec, session, packet, &mut self.frame)
            .map_err(|code| codec_failure(codec, "decode", code))?;

        let samples = per_channel * channels;
        if samples > self.frame.len() {
            warn!(
                "{} decode reported {} samples for a {}-sample buffer",
                codec.name(),
                samples,
                self.frame.len()
            );
            return Err(TranscodeError::internal_error(format!(
                "{} decoder reported {} samples but the frame buffer holds {}",
                codec.name(),
                samples,
                self.frame.len()
            )));
        }
        Ok(samples)
    }

    /// Release the session back to its pool
    pub fn close(self) -> ConverterStats {
        debug!(
            "Closing {} converter on {}: {:?}",
            self.lease.direction(),
            self.lease.id(),
            self.stats
        );
        self.stats
    }
}

impl<C: PerceptualCodec> std::fmt::Debug for StreamingConverter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingConverter")
            .field("lease", &self.lease)
            .field("law", &self.law)
            .field("frame_len", &self.chunker.frame_len())
            .field("transfer", &self.transfer)
            .field("stats", &self.stats)
            .finish()
    }
}

fn codec_failure<C: PerceptualCodec>(codec: &C, operation: &'static str, code: NativeErrorCode) -> TranscodeError {
    let message = codec.error_message(code);
    warn!("{} {} failed: {} ({})", codec.name(), operation, message, code.code());
    TranscodeError::codec(operation, code.code(), message)
}

/// Feed every frame of `pcm` to the engine, passing each packet to `sink`
///
/// Returns the number of frames encoded. Stops at the first failure.
fn encode_frames<C, F>(
    lease: &mut SessionLease<C>,
    chunker: &FrameChunker,
    mode: TransferMode,
    pcm: &[i16],
    packet: &mut [u8],
    mut sink: F,
) -> Result<usize>
where
    C: PerceptualCodec,
    F: FnMut(&[u8]),
{
    let (codec, session) = lease.parts_mut();
    let mut frames = 0;

    for frame in chunker.split(pcm) {
        match transfer::encode_frame(mode, codec, session, &frame, packet) {
            Ok(written) if written <= packet.len() => sink(&packet[..written]),
            Ok(written) => {
                warn!(
                    "{} encode reported {} bytes for a {}-byte packet",
                    codec.name(),
                    written,
                    packet.len()
                );
                return Err(TranscodeError::internal_error(format!(
                    "{} encoder reported {} bytes but the packet buffer holds {}",
                    codec.name(),
                    written,
                    packet.len()
                )));
            }
            Err(code) => return Err(codec_failure(codec, "encode", code)),
        }
        frames += 1;
    }

    Ok(frames)
}
