//! Perceptual codec engines
//!
//! [`PerceptualCodec`] is the seam between this library and the native
//! perceptual codec. A codec value is shared by every session of a pool and
//! must therefore be `Send + Sync`; the per-stream state lives in the
//! associated `Session` type, which is moved between the pool and its
//! leases and never shared.
//!
//! Two engines ship with the crate:
//!
//! - [`sim::SimCodec`] (feature `sim`, on by default): deterministic and
//!   dependency-free, used by the test suite
//! - [`opus::OpusEngine`] (feature `opus`): libopus through the `opus` crate

#[cfg(feature = "opus")]
pub mod opus;
#[cfg(feature = "sim")]
pub mod sim;

use crate::error::Result;
use crate::types::{Direction, SessionConfig};
use std::fmt;

/// Negative result code reported by an engine for a failed call
///
/// The constants follow the libopus numbering so that real and simulated
/// engines report the same codes for the same failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeErrorCode(pub i32);

impl NativeErrorCode {
    /// One or more invalid or out of range arguments
    pub const BAD_ARG: Self = Self(-1);
    /// Not enough bytes allocated in the output buffer
    pub const BUFFER_TOO_SMALL: Self = Self(-2);
    /// An internal error was detected
    pub const INTERNAL: Self = Self(-3);
    /// The compressed data passed is corrupted
    pub const INVALID_PACKET: Self = Self(-4);
    /// Invalid or unsupported request number
    pub const UNIMPLEMENTED: Self = Self(-5);
    /// A session structure is invalid or already freed
    pub const INVALID_STATE: Self = Self(-6);
    /// Memory allocation has failed
    pub const ALLOC_FAIL: Self = Self(-7);

    /// Raw code
    pub fn code(self) -> i32 {
        self.0
    }

    /// Human-readable description of a code
    pub fn description(self) -> &'static str {
        match self.0 {
            0 => "success",
            -1 => "invalid argument",
            -2 => "buffer too small",
            -3 => "internal error",
            -4 => "corrupted stream",
            -5 => "request not implemented",
            -6 => "invalid state",
            -7 => "memory allocation failed",
            _ => "unknown error",
        }
    }
}

impl fmt::Display for NativeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.0)
    }
}

/// A stateful perceptual audio codec
pub trait PerceptualCodec: Send + Sync + 'static {
    /// Opaque per-stream encoder or decoder state
    type Session: Send + 'static;

    /// Engine name for logs
    fn name(&self) -> &'static str;

    /// Create an encoder session
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the engine rejects the parameters.
    fn create_encoder(&self, config: &SessionConfig) -> Result<Self::Session>;

    /// Create a decoder session
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the engine rejects the parameters.
    fn create_decoder(&self, config: &SessionConfig) -> Result<Self::Session>;

    /// Encode one whole frame of interleaved PCM into `packet`
    ///
    /// Returns the number of packet bytes written.
    fn encode(
        &self,
        session: &mut Self::Session,
        frame: &[i16],
        packet: &mut [u8],
    ) -> std::result::Result<usize, NativeErrorCode>;

    /// Decode one packet into `pcm`
    ///
    /// `pcm.len()` is the largest frame the caller accepts. Returns the number
    /// of samples written per channel. An empty packet asks the engine to
    /// conceal a lost frame.
    fn decode(
        &self,
        session: &mut Self::Session,
        packet: &[u8],
        pcm: &mut [i16],
    ) -> std::result::Result<usize, NativeErrorCode>;

    /// Free a session
    ///
    /// Takes the session by value, so a session cannot be destroyed twice.
    fn destroy_session(&self, session: Self::Session) {
        drop(session);
    }

    /// Diagnostic message for a result code
    fn error_message(&self, code: NativeErrorCode) -> String {
        code.description().to_string()
    }

    /// Create a session for `direction`
    fn create_session(&self, direction: Direction, config: &SessionConfig) -> Result<Self::Session> {
        match direction {
            Direction::Encode => self.create_encoder(config),
            Direction::Decode => self.create_decoder(config),
        }
    }
}
