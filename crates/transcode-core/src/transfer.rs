//! Buffer transfer at the engine call boundary
//!
//! In [`TransferMode::Borrowed`] the engine reads the caller's frame and
//! writes the caller's packet buffer in place. The engine trait gives it no
//! lifetime to hold either buffer past the call, and the borrow keeps the
//! caller from touching them while the call runs.
//!
//! [`TransferMode::Staged`] copies the input into a fresh buffer, lets the
//! engine write into another fresh buffer and copies the result back. It
//! produces identical output and exists as the baseline the borrowed path is
//! measured against.

use crate::engine::{NativeErrorCode, PerceptualCodec};
use serde::{Deserialize, Serialize};

/// How buffers reach the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Hand the caller's buffers to the engine directly
    #[default]
    Borrowed,
    /// Copy through freshly allocated staging buffers
    Staged,
}

/// Encode one frame into `packet`, returning the bytes written
pub fn encode_frame<C: PerceptualCodec>(
    mode: TransferMode,
    codec: &C,
    session: &mut C::Session,
    frame: &[i16],
    packet: &mut [u8],
) -> Result<usize, NativeErrorCode> {
    match mode {
        TransferMode::Borrowed => codec.encode(session, frame, packet),
        TransferMode::Staged => {
            let staged_frame = frame.to_vec();
            let mut staged_packet = vec![0u8; packet.len()];
            let written = codec.encode(session, &staged_frame, &mut staged_packet)?;
            packet.copy_from_slice(&staged_packet);
            Ok(written)
        }
    }
}

/// Decode one packet into `pcm`, returning samples per channel
pub fn decode_packet<C: PerceptualCodec>(
    mode: TransferMode,
    codec: &C,
    session: &mut C::Session,
    packet: &[u8],
    pcm: &mut [i16],
) -> Result<usize, NativeErrorCode> {
    match mode {
        TransferMode::Borrowed => codec.decode(session, packet, pcm),
        TransferMode::Staged => {
            let staged_packet = packet.to_vec();
            let mut staged_pcm = vec![0i16; pcm.len()];
            let decoded = codec.decode(session, &staged_packet, &mut staged_pcm)?;
            pcm.copy_from_slice(&staged_pcm);
            Ok(decoded)
        }
    }
}
