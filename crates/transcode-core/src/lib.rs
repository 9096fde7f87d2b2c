//! # Transcode-Core: G.711 to Perceptual Codec Transcoding
//!
//! Converts telephony audio between 8-bit G.711 companded samples and the
//! packets of a perceptual codec such as Opus, sized for many concurrent
//! voice streams sharing a small number of native codec sessions.
//!
//! ## Components
//!
//! - **[`g711`]**: bit-exact A-law/u-law companding, table driven
//! - **[`frame`]**: fixed-size framing of PCM buffers
//! - **[`pool`]**: bounded, blocking pool of codec sessions with FIFO waiters,
//!   timeouts and cancellation
//! - **[`converter`]**: per-stream conversion over a leased session
//! - **[`transfer`]**: borrowed and staged buffer hand-off to the engine
//! - **[`engine`]**: the [`PerceptualCodec`] trait and its implementations
//!
//! ## Usage
//!
//! ```rust
//! # #[cfg(feature = "sim")]
//! # fn main() -> transcode_core::Result<()> {
//! use std::sync::Arc;
//! use transcode_core::engine::sim::SimCodec;
//! use transcode_core::{SessionPool, StreamingConverter, TranscodeConfig};
//!
//! transcode_core::init();
//!
//! let config = TranscodeConfig::default();
//! let pool = SessionPool::encoders(Arc::new(SimCodec::new()), config.session_config(), 4)?;
//!
//! let mut converter = StreamingConverter::open(&pool, &config)?;
//! let packets = converter.encode_chunk(&[0xD5; 160])?; // 20ms of A-law silence
//! assert!(!packets.is_empty());
//! converter.close();
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sim"))]
//! # fn main() {}
//! ```
//!
//! ## Feature Flags
//!
//! - `sim`: deterministic simulated engine (enabled by default)
//! - `opus`: libopus engine (requires the system library)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod converter;
pub mod engine;
pub mod error;
pub mod frame;
pub mod g711;
pub mod logging;
pub mod oneshot;
pub mod pool;
pub mod transfer;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use config::TranscodeConfig;
pub use converter::{ConverterStats, StreamingConverter};
pub use engine::{NativeErrorCode, PerceptualCodec};
pub use error::{ErrorCategory, Result, TranscodeError};
pub use frame::{FrameChunker, RemainderPolicy};
pub use pool::{CancelToken, CloseSummary, PoolStats, SessionLease, SessionPool};
pub use transfer::TransferMode;
pub use types::{
    ApplicationProfile, Direction, FrameDuration, LawKind, SessionConfig, SessionId,
};

use std::sync::OnceLock;

/// Version information for the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engines compiled into this build
pub const ENGINES: &[&str] = &[
    #[cfg(feature = "sim")]
    "sim",
    #[cfg(feature = "opus")]
    "opus",
];

static INIT: OnceLock<()> = OnceLock::new();

/// Initialize the library
///
/// Builds the G.711 lookup tables and installs the default fmt subscriber
/// unless the application already installed one. Safe to call any number of
/// times from any thread; only the first call does work.
pub fn init() {
    INIT.get_or_init(|| {
        logging::init_logging(&logging::LoggingConfig::default());

        let entries = g711::init_tables();

        tracing::info!("Transcode-Core v{} initialized", VERSION);
        tracing::info!("G.711 tables ready ({} entries)", entries);
        tracing::info!("Engines: {:?}", ENGINES);
    });
}

/// Get library information
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        engines: ENGINES.to_vec(),
        sample_rates: types::SUPPORTED_SAMPLE_RATES.to_vec(),
    }
}

/// Library information structure
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    /// Library version
    pub version: &'static str,
    /// Engines compiled into this build
    pub engines: Vec<&'static str>,
    /// Sample rates the perceptual codec accepts
    pub sample_rates: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        assert!(INIT.get().is_some());
    }

    #[test]
    fn test_info() {
        let info = info();
        assert_eq!(info.version, VERSION);
        assert!(info.sample_rates.contains(&8000));

        #[cfg(feature = "sim")]
        assert!(info.engines.contains(&"sim"));

        #[cfg(feature = "opus")]
        assert!(info.engines.contains(&"opus"));
    }
}
