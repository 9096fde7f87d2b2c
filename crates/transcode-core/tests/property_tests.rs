//! Property tests for companding and framing

use proptest::prelude::*;
use transcode_core::frame::{self, FrameChunker, RemainderPolicy};
use transcode_core::g711;
use transcode_core::LawKind;

fn law() -> impl Strategy<Value = LawKind> {
    prop_oneof![Just(LawKind::ALaw), Just(LawKind::MuLaw)]
}

fn policy() -> impl Strategy<Value = RemainderPolicy> {
    prop_oneof![Just(RemainderPolicy::Drop), Just(RemainderPolicy::PadWithSilence)]
}

#[test]
fn test_companding_error_is_within_one_step() {
    for law in [LawKind::ALaw, LawKind::MuLaw] {
        for sample in i16::MIN..=i16::MAX {
            let decoded = g711::decode(g711::encode(sample, law), law);
            let error = (i32::from(decoded) - i32::from(sample)).unsigned_abs();
            let step = u32::from(g711::quantization_step(law, sample));
            assert!(
                error <= step,
                "{} sample {} decoded to {} (step {})",
                law,
                sample,
                decoded,
                step
            );
        }
    }
}

proptest! {
    #[test]
    fn prop_code_points_are_stable(law in law(), code in any::<u8>()) {
        // Re-encoding a decoded code point lands on the same level
        let once = g711::decode(code, law);
        let twice = g711::decode(g711::encode(once, law), law);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_encode_is_monotonic(law in law(), a in any::<i16>(), b in any::<i16>()) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let low = g711::decode(g711::encode(low, law), law);
        let high = g711::decode(g711::encode(high, law), law);
        prop_assert!(low <= high);
    }

    #[test]
    fn prop_buffer_apis_match_per_sample(
        law in law(),
        samples in prop::collection::vec(any::<i16>(), 0..512),
    ) {
        let encoded = g711::encode_to_vec(&samples, law);
        prop_assert_eq!(encoded.len(), samples.len());
        for (sample, code) in samples.iter().zip(&encoded) {
            prop_assert_eq!(*code, g711::encode(*sample, law));
        }

        let mut decoded = vec![1i16; 3];
        g711::decode_into_vec(&encoded, law, &mut decoded);
        prop_assert_eq!(decoded.len(), encoded.len());
    }

    #[test]
    fn prop_frame_count_matches_policy(
        frame_len in 1usize..400,
        len in 0usize..4000,
        policy in policy(),
    ) {
        let chunker = FrameChunker::new(frame_len, policy).unwrap();
        let pcm = vec![7i16; len];
        let frames: Vec<_> = chunker.split(&pcm).collect();

        let full = len / frame_len;
        let expected = match policy {
            RemainderPolicy::PadWithSilence if len % frame_len != 0 => full + 1,
            _ => full,
        };
        prop_assert_eq!(frames.len(), expected);
        prop_assert_eq!(chunker.frame_count(len), expected);
        prop_assert!(frames.iter().all(|f| f.len() == frame_len));
    }

    #[test]
    fn prop_join_restores_framed_prefix(
        frame_len in 1usize..200,
        pcm in prop::collection::vec(any::<i16>(), 0..2000),
        policy in policy(),
    ) {
        let chunker = FrameChunker::new(frame_len, policy).unwrap();
        let joined = frame::join(chunker.split(&pcm));

        let whole = pcm.len() / frame_len * frame_len;
        prop_assert_eq!(&joined[..whole], &pcm[..whole]);

        match policy {
            RemainderPolicy::Drop => prop_assert_eq!(joined.len(), whole),
            RemainderPolicy::PadWithSilence => {
                prop_assert_eq!(&joined[whole..pcm.len()], &pcm[whole..]);
                prop_assert!(joined[pcm.len()..].iter().all(|&s| s == 0));
            }
        }
    }
}
