//! G.711 companding codec
//!
//! Stateless, bit-exact conversion between 8-bit A-law/u-law code points and
//! 16-bit linear PCM. Every input is valid, so nothing here returns an error.
//!
//! The per-sample functions go through lookup tables built once per process;
//! [`reference`] holds the algorithms the tables are generated from.
//!
//! ## Usage
//!
//! ```rust
//! use transcode_core::g711;
//! use transcode_core::LawKind;
//!
//! let codes = [0xD5u8; 160];
//! let pcm = g711::decode_to_vec(&codes, LawKind::ALaw);
//! assert!(pcm.iter().all(|&s| s == 8));
//!
//! let back = g711::encode_to_vec(&pcm, LawKind::ALaw);
//! assert_eq!(back, codes);
//! ```

pub mod reference;
pub mod tables;

pub use tables::init_tables;

use crate::types::LawKind;

/// Expand one code point to 16-bit linear PCM
#[inline]
pub fn decode(code: u8, law: LawKind) -> i16 {
    match law {
        LawKind::ALaw => tables::alaw_expand_table(code),
        LawKind::MuLaw => tables::ulaw_expand_table(code),
    }
}

/// Compress one 16-bit linear sample
#[inline]
pub fn encode(sample: i16, law: LawKind) -> u8 {
    match law {
        LawKind::ALaw => tables::alaw_compress_table(sample),
        LawKind::MuLaw => tables::ulaw_compress_table(sample),
    }
}

/// Width of the quantization interval containing `sample`
///
/// Bounds the round-trip error: `|decode(encode(x)) - x| <= quantization_step(x)`.
pub fn quantization_step(law: LawKind, sample: i16) -> u16 {
    match law {
        LawKind::ALaw => reference::alaw_step(sample),
        LawKind::MuLaw => reference::ulaw_step(sample),
    }
}

/// Expand a slice of code points into a PCM slice of the same length
///
/// # Panics
///
/// Panics if the input and output slices have different lengths.
pub fn decode_into(codes: &[u8], law: LawKind, output: &mut [i16]) {
    assert_eq!(
        codes.len(),
        output.len(),
        "Input and output slices must have the same length"
    );

    match law {
        LawKind::ALaw => {
            for (out, &code) in output.iter_mut().zip(codes) {
                *out = tables::alaw_expand_table(code);
            }
        }
        LawKind::MuLaw => {
            for (out, &code) in output.iter_mut().zip(codes) {
                *out = tables::ulaw_expand_table(code);
            }
        }
    }
}

/// Compress a PCM slice into a code point slice of the same length
///
/// # Panics
///
/// Panics if the input and output slices have different lengths.
pub fn encode_into(samples: &[i16], law: LawKind, output: &mut [u8]) {
    assert_eq!(
        samples.len(),
        output.len(),
        "Input and output slices must have the same length"
    );

    match law {
        LawKind::ALaw => {
            for (out, &sample) in output.iter_mut().zip(samples) {
                *out = tables::alaw_compress_table(sample);
            }
        }
        LawKind::MuLaw => {
            for (out, &sample) in output.iter_mut().zip(samples) {
                *out = tables::ulaw_compress_table(sample);
            }
        }
    }
}

/// Expand code points into `buffer`, replacing its contents
///
/// Reuses the buffer's allocation once it has grown to the chunk size.
pub fn decode_into_vec(codes: &[u8], law: LawKind, buffer: &mut Vec<i16>) {
    buffer.clear();
    buffer.extend(codes.iter().map(|&code| decode(code, law)));
}

/// Compress samples into `buffer`, replacing its contents
pub fn encode_into_vec(samples: &[i16], law: LawKind, buffer: &mut Vec<u8>) {
    buffer.clear();
    buffer.extend(samples.iter().map(|&sample| encode(sample, law)));
}

/// Expand code points into a new PCM vector
pub fn decode_to_vec(codes: &[u8], law: LawKind) -> Vec<i16> {
    let mut pcm = Vec::with_capacity(codes.len());
    decode_into_vec(codes, law, &mut pcm);
    pcm
}

/// Compress samples into a new code point vector
pub fn encode_to_vec(samples: &[i16], law: LawKind) -> Vec<u8> {
    let mut codes = Vec::with_capacity(samples.len());
    encode_into_vec(samples, law, &mut codes);
    codes
}

/// Expand code points into little-endian PCM bytes (two bytes per code)
pub fn law_to_pcm_bytes(codes: &[u8], law: LawKind) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(codes.len() * 2);
    for &code in codes {
        bytes.extend_from_slice(&decode(code, law).to_le_bytes());
    }
    bytes
}

/// Compress little-endian PCM bytes into code points
///
/// A trailing odd byte does not form a sample and is ignored.
pub fn pcm_bytes_to_law(bytes: &[u8], law: LawKind) -> Vec<u8> {
    bytes
        .chunks_exact(2)
        .map(|pair| encode(i16::from_le_bytes([pair[0], pair[1]]), law))
        .collect()
}
