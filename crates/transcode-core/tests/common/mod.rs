//! Shared test utilities: an instrumented engine wrapping the simulated one

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use transcode_core::engine::sim::{SimCodec, SimSession};
use transcode_core::{Direction, NativeErrorCode, PerceptualCodec, Result, SessionConfig, TranscodeError};

/// Session handed out by [`InstrumentedCodec`]
#[derive(Debug)]
pub struct InstrumentedSession {
    id: u64,
    inner: SimSession,
}

/// Wraps [`SimCodec`] with call counters, exclusivity checks and failure injection
#[derive(Debug, Default)]
pub struct InstrumentedCodec {
    inner: SimCodec,
    next_id: AtomicU64,
    created: AtomicUsize,
    destroyed: AtomicUsize,
    encode_calls: AtomicUsize,
    decode_calls: AtomicUsize,
    in_use: Mutex<HashSet<u64>>,
    violations: AtomicUsize,
    /// Fail the creation with this zero-based index
    fail_creation_at: Option<usize>,
    /// Fail the encode call with this zero-based index
    fail_encode_at: Option<usize>,
}

impl InstrumentedCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_creation_at(mut self, index: usize) -> Self {
        self.fail_creation_at = Some(index);
        self
    }

    pub fn failing_encode_at(mut self, call: usize) -> Self {
        self.fail_encode_at = Some(call);
        self
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Sessions created and not yet destroyed
    pub fn live(&self) -> usize {
        self.created() - self.destroyed()
    }

    pub fn encode_calls(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }

    pub fn decode_calls(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }

    /// Times a session was observed in two calls at once
    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    fn create(
        &self,
        direction: Direction,
        config: &SessionConfig,
        make: impl FnOnce(&SimCodec, &SessionConfig) -> Result<SimSession>,
    ) -> Result<InstrumentedSession> {
        let index = self.next_id.fetch_add(1, Ordering::SeqCst);
        if self.fail_creation_at == Some(index as usize) {
            return Err(TranscodeError::session_creation(direction, "injected creation failure"));
        }

        let inner = make(&self.inner, config)?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(InstrumentedSession { id: index, inner })
    }

    /// Run `call` while marking the session busy, yielding inside the window
    fn exclusive<T>(&self, id: u64, call: impl FnOnce() -> T) -> T {
        if !self.in_use.lock().insert(id) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        thread::yield_now();
        let result = call();
        self.in_use.lock().remove(&id);
        result
    }
}

impl PerceptualCodec for InstrumentedCodec {
    type Session = InstrumentedSession;

    fn name(&self) -> &'static str {
        "instrumented"
    }

    fn create_encoder(&self, config: &SessionConfig) -> Result<InstrumentedSession> {
        self.create(Direction::Encode, config, |codec, config| codec.create_encoder(config))
    }

    fn create_decoder(&self, config: &SessionConfig) -> Result<InstrumentedSession> {
        self.create(Direction::Decode, config, |codec, config| codec.create_decoder(config))
    }

    fn encode(
        &self,
        session: &mut InstrumentedSession,
        frame: &[i16],
        packet: &mut [u8],
    ) -> std::result::Result<usize, NativeErrorCode> {
        let call = self.encode_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_encode_at == Some(call) {
            return Err(NativeErrorCode::INTERNAL);
        }
        let InstrumentedSession { id, inner } = session;
        self.exclusive(*id, || self.inner.encode(inner, frame, packet))
    }

    fn decode(
        &self,
        session: &mut InstrumentedSession,
        packet: &[u8],
        pcm: &mut [i16],
    ) -> std::result::Result<usize, NativeErrorCode> {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        let InstrumentedSession { id, inner } = session;
        self.exclusive(*id, || self.inner.decode(inner, packet, pcm))
    }

    fn destroy_session(&self, session: InstrumentedSession) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        self.inner.destroy_session(session.inner);
    }

    fn error_message(&self, code: NativeErrorCode) -> String {
        format!("instrumented: {}", code.description())
    }
}

/// Sine wave of `len` samples
pub fn sine(len: usize, sample_rate: u32, frequency: f32, amplitude: f32) -> Vec<i16> {
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let sample = (2.0 * std::f32::consts::PI * frequency * t).sin() * amplitude;
            sample.clamp(-32768.0, 32767.0) as i16
        })
        .collect()
}
