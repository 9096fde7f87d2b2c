//! Integration tests for streaming conversion over pooled sessions

#![cfg(feature = "sim")]

mod common;

use common::{sine, InstrumentedCodec};
use std::sync::Arc;
use transcode_core::engine::sim::SimCodec;
use transcode_core::oneshot::{compressed_to_g711, g711_to_compressed};
use transcode_core::{
    g711, FrameDuration, LawKind, NativeErrorCode, RemainderPolicy, SessionPool,
    StreamingConverter, TranscodeConfig, TranscodeError,
};

fn encoder_pool(codec: &Arc<InstrumentedCodec>, config: &TranscodeConfig) -> SessionPool<InstrumentedCodec> {
    SessionPool::encoders(Arc::clone(codec), config.session_config(), 2).unwrap()
}

#[test]
fn test_alaw_silence_round_trip() {
    let config = TranscodeConfig::default();
    let codec = Arc::new(SimCodec::new());
    let encoders = SessionPool::encoders(Arc::clone(&codec), config.session_config(), 1).unwrap();
    let decoders = SessionPool::decoders(codec, config.session_config(), 1).unwrap();

    let mut encoder = StreamingConverter::open(&encoders, &config).unwrap();
    let packet = encoder.encode_chunk(&[0xD5; 160]).unwrap();
    assert!(!packet.is_empty());

    let mut decoder = StreamingConverter::open(&decoders, &config).unwrap();
    let pcm = decoder.decode_pcm(&packet).unwrap();
    assert_eq!(pcm.len(), 160);

    // Silence comes back within one quantization step of zero
    let step = i32::from(LawKind::ALaw.quantization_step(0));
    assert!(pcm.iter().all(|&s| i32::from(s).abs() <= step));
}

#[test]
fn test_one_engine_call_per_frame() {
    let config = TranscodeConfig::default();
    let codec = Arc::new(InstrumentedCodec::new());
    let pool = encoder_pool(&codec, &config);
    let mut converter = StreamingConverter::open(&pool, &config).unwrap();

    // 400ms of 8kHz A-law is twenty 20ms frames
    let packets = converter.encode_chunk_packets(&vec![0xD5; 3200]).unwrap();
    assert_eq!(packets.len(), 20);
    assert_eq!(codec.encode_calls(), 20);

    let stats = converter.stats();
    assert_eq!(stats.frames, 20);
    assert_eq!(stats.input_bytes, 3200);
}

#[test]
fn test_frame_duration_sets_call_count() {
    let config = TranscodeConfig::default()
        .with_sample_rate(16000)
        .with_frame_duration(FrameDuration::Ms10);
    let codec = Arc::new(InstrumentedCodec::new());
    let pool = encoder_pool(&codec, &config);
    let mut converter = StreamingConverter::open(&pool, &config).unwrap();
    assert_eq!(converter.frame_len(), 160);

    let pcm = sine(16000, 16000, 440.0, 8000.0);
    let packets = converter.encode_pcm(&pcm).unwrap();
    assert_eq!(codec.encode_calls(), 100);
    assert_eq!(packets.len(), 100 * SimCodec::packet_len(160));
}

#[test]
fn test_engine_error_aborts_chunk_only() {
    let config = TranscodeConfig::default();
    // Fails the third frame of the first chunk
    let codec = Arc::new(InstrumentedCodec::new().failing_encode_at(2));
    let pool = encoder_pool(&codec, &config);
    let mut converter = StreamingConverter::open(&pool, &config).unwrap();

    let err = converter.encode_chunk(&[0xD5; 800]).unwrap_err();
    assert!(matches!(err, TranscodeError::Codec { operation: "encode", .. }));
    assert_eq!(err.codec_code(), Some(NativeErrorCode::INTERNAL.code()));
    assert_eq!(codec.encode_calls(), 3);

    let packets = converter.encode_chunk(&[0xD5; 320]).unwrap();
    assert_eq!(packets.len(), 2 * SimCodec::packet_len(160));

    let stats = converter.stats();
    assert_eq!(stats.failed_chunks, 1);
    assert_eq!(stats.chunks, 1);
    assert_eq!(stats.frames, 2);
}

#[test]
fn test_bad_packet_surfaces_engine_code() {
    let config = TranscodeConfig::default();
    let pool = SessionPool::decoders(Arc::new(SimCodec::new()), config.session_config(), 1).unwrap();
    let mut converter = StreamingConverter::open(&pool, &config).unwrap();

    let err = converter.decode_chunk(&[0x10, 0x00, 0x01, 0x00]).unwrap_err();
    assert_eq!(err.codec_code(), Some(NativeErrorCode::INVALID_PACKET.code()));
    assert!(err.to_string().contains("decode"));
}

#[test]
fn test_empty_packet_conceals_a_frame() {
    let config = TranscodeConfig::default().with_law(LawKind::MuLaw);
    let pool = SessionPool::decoders(Arc::new(SimCodec::new()), config.session_config(), 1).unwrap();
    let mut converter = StreamingConverter::open(&pool, &config).unwrap();

    let law = converter.decode_chunk(&[]).unwrap();
    assert_eq!(law, vec![0xFF; 160]);
}

#[test]
fn test_speech_like_signal_survives_round_trip() {
    let config = TranscodeConfig::default().with_law(LawKind::MuLaw);
    let pcm = sine(1600, 8000, 300.0, 12000.0);
    let law = g711::encode_to_vec(&pcm, LawKind::MuLaw);

    let packets = g711_to_compressed(SimCodec::new(), &law, &config).unwrap();
    let frame = SimCodec::packet_len(160);
    assert_eq!(packets.len(), 10 * frame);

    let decoded = compressed_to_g711(SimCodec::new(), packets.chunks(frame), &config).unwrap();
    assert_eq!(decoded.len(), law.len());

    // The simulated engine keeps the top byte, so levels stay close
    let original = g711::decode_to_vec(&law, LawKind::MuLaw);
    let restored = g711::decode_to_vec(&decoded, LawKind::MuLaw);
    for (a, b) in original.iter().zip(&restored) {
        assert!((i32::from(*a) - i32::from(*b)).abs() < 1024, "{} vs {}", a, b);
    }
}

#[test]
fn test_padded_remainder_reaches_engine() {
    let config = TranscodeConfig::default().with_remainder_policy(RemainderPolicy::PadWithSilence);
    let codec = Arc::new(InstrumentedCodec::new());
    let pool = encoder_pool(&codec, &config);
    let mut converter = StreamingConverter::open(&pool, &config).unwrap();

    let packets = converter.encode_chunk_packets(&[0xD5; 170]).unwrap();
    assert_eq!(packets.len(), 2);
    assert_eq!(codec.encode_calls(), 2);
}

#[test]
fn test_one_shot_tears_down_sessions() {
    let config = TranscodeConfig::default();
    let codec = Arc::new(InstrumentedCodec::new());

    {
        let pool = SessionPool::encoders(Arc::clone(&codec), config.session_config(), 1).unwrap();
        let mut converter = StreamingConverter::open(&pool, &config).unwrap();
        converter.encode_chunk(&[0xD5; 480]).unwrap();
        converter.close();
        pool.close();
    }

    assert_eq!(codec.created(), 1);
    assert_eq!(codec.destroyed(), 1);
    assert_eq!(codec.live(), 0);
}

#[test]
fn test_converter_releases_session_on_drop() {
    let config = TranscodeConfig::default();
    let codec = Arc::new(InstrumentedCodec::new());
    let pool = encoder_pool(&codec, &config);

    let first = StreamingConverter::open(&pool, &config).unwrap();
    let second = StreamingConverter::open(&pool, &config).unwrap();
    assert_ne!(first.session_id(), second.session_id());
    assert_eq!(pool.stats().idle, 0);

    drop(first);
    second.close();
    assert_eq!(pool.stats().idle, 2);
}

#[test]
fn test_open_honors_acquire_timeout() {
    let config = TranscodeConfig::default().with_acquire_timeout(std::time::Duration::from_millis(20));
    let pool = SessionPool::encoders(Arc::new(SimCodec::new()), config.session_config(), 1).unwrap();
    let _held = pool.acquire().unwrap();

    let err = StreamingConverter::open(&pool, &config).unwrap_err();
    assert!(matches!(err, TranscodeError::AcquireTimedOut { .. }));
    assert!(err.is_recoverable());
}
