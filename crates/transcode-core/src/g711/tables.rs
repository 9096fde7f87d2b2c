//! G.711 lookup tables
//!
//! Generated once from [`super::reference`] on first use and shared by every
//! thread for the life of the process.
//!
//! ## Memory Usage
//!
//! - encode tables: 65536 bytes per law
//! - decode tables: 512 bytes per law (256 samples × 2 bytes)

use super::reference::{alaw_compress, alaw_expand, ulaw_compress, ulaw_expand};
use std::sync::LazyLock;

/// 16-bit linear → A-law, indexed by `sample as u16 ^ 0x8000`
static ALAW_ENCODE_TABLE: LazyLock<Box<[u8]>> = LazyLock::new(|| build_encode_table(alaw_compress));

/// A-law → 16-bit linear
static ALAW_DECODE_TABLE: LazyLock<[i16; 256]> = LazyLock::new(|| build_decode_table(alaw_expand));

/// 16-bit linear → u-law, indexed by `sample as u16 ^ 0x8000`
static ULAW_ENCODE_TABLE: LazyLock<Box<[u8]>> = LazyLock::new(|| build_encode_table(ulaw_compress));

/// u-law → 16-bit linear
static ULAW_DECODE_TABLE: LazyLock<[i16; 256]> = LazyLock::new(|| build_decode_table(ulaw_expand));

fn build_encode_table(compress: fn(i16) -> u8) -> Box<[u8]> {
    (0..=u16::MAX)
        .map(|index| compress((index ^ 0x8000) as i16))
        .collect()
}

fn build_decode_table(expand: fn(u8) -> i16) -> [i16; 256] {
    let mut table = [0i16; 256];
    for (code, slot) in table.iter_mut().enumerate() {
        *slot = expand(code as u8);
    }
    table
}

#[inline]
fn encode_index(sample: i16) -> usize {
    ((sample as u16) ^ 0x8000) as usize
}

/// A-law compression by table lookup
#[inline]
pub fn alaw_compress_table(sample: i16) -> u8 {
    ALAW_ENCODE_TABLE[encode_index(sample)]
}

/// A-law expansion by table lookup
#[inline]
pub fn alaw_expand_table(code: u8) -> i16 {
    ALAW_DECODE_TABLE[code as usize]
}

/// u-law compression by table lookup
#[inline]
pub fn ulaw_compress_table(sample: i16) -> u8 {
    ULAW_ENCODE_TABLE[encode_index(sample)]
}

/// u-law expansion by table lookup
#[inline]
pub fn ulaw_expand_table(code: u8) -> i16 {
    ULAW_DECODE_TABLE[code as usize]
}

/// Force generation of every table
///
/// Returns the total number of entries, which callers can log.
pub fn init_tables() -> usize {
    ALAW_ENCODE_TABLE.len()
        + ULAW_ENCODE_TABLE.len()
        + ALAW_DECODE_TABLE.len()
        + ULAW_DECODE_TABLE.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_match_reference() {
        for sample in i16::MIN..=i16::MAX {
            assert_eq!(alaw_compress_table(sample), alaw_compress(sample));
            assert_eq!(ulaw_compress_table(sample), ulaw_compress(sample));
        }
        for code in 0..=255u8 {
            assert_eq!(alaw_expand_table(code), alaw_expand(code));
            assert_eq!(ulaw_expand_table(code), ulaw_expand(code));
        }
    }

    #[test]
    fn test_init_tables() {
        assert_eq!(init_tables(), 2 * 65536 + 2 * 256);
    }
}
