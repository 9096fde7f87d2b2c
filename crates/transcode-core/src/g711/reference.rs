//! G.711 reference algorithms
//!
//! Bit-exact with ITU-T Recommendation G.711 and the STL `g711` module. The
//! lookup tables in [`super::tables`] are generated from these functions, and
//! they stay public so callers can cross-check the tables.
//!
//! ## A-law
//! - One's-complement magnitude for negative input, so `-32768` maps onto the
//!   same code as `-32767` without overflow
//! - 3-bit segment found by a doubling search, 4-bit mantissa
//! - Even bits toggled on the wire (XOR `0x55`), sign bit set for positive input
//!
//! ## u-law
//! - One's-complement magnitude biased by 132 and clamped to 15 bits
//! - Exponent from the position of the leading one above bit 7
//! - Every bit inverted on the wire

/// Bias added to the u-law magnitude before segment search
pub const ULAW_BIAS: u16 = 132;

/// Largest biased u-law magnitude
const ULAW_CLIP: u16 = 0x7FFF;

/// Number of significant bits in `value`
#[inline]
fn bit_length(value: u16) -> u32 {
    u16::BITS - value.leading_zeros()
}

/// One's-complement magnitude of a sample
///
/// `!x` for negative input lands in `0..=32767`, which is the clamp.
#[inline]
fn magnitude(sample: i16) -> u16 {
    if sample < 0 {
        (!sample) as u16
    } else {
        sample as u16
    }
}

/// A-law compression of one 16-bit linear sample
pub fn alaw_compress(sample: i16) -> u8 {
    let mut ix = magnitude(sample) >> 4;

    if ix > 15 {
        let mut exponent: u16 = 1;
        while ix > 16 + 15 {
            ix >>= 1;
            exponent += 1;
        }
        ix = (exponent.min(7) << 4) | (ix - 16);
    }

    let mask = if sample >= 0 { 0xD5 } else { 0x55 };
    (ix as u8) ^ mask
}

/// A-law expansion of one code point to the midpoint of its interval
pub fn alaw_expand(code: u8) -> i16 {
    let ix = i16::from(code ^ 0x55) & 0x7F;
    let exponent = ix >> 4;
    let mut mantissa = ix & 0x0F;

    if exponent > 0 {
        mantissa += 16;
    }

    mantissa = (mantissa << 4) + 0x08;

    if exponent > 1 {
        mantissa <<= exponent - 1;
    }

    if code > 127 {
        mantissa
    } else {
        -mantissa
    }
}

/// u-law compression of one 16-bit linear sample
pub fn ulaw_compress(sample: i16) -> u8 {
    let biased = (magnitude(sample) + ULAW_BIAS).min(ULAW_CLIP);
    let exponent = bit_length(biased >> 8);
    let mantissa = (biased >> (exponent + 3)) & 0x0F;

    let code = ((exponent as u16) << 4 | mantissa) as u8;
    if sample >= 0 {
        code ^ 0xFF
    } else {
        code ^ 0x7F
    }
}

/// u-law expansion of one code point
pub fn ulaw_expand(code: u8) -> i16 {
    let inverted = i32::from(!code);
    let exponent = (inverted >> 4) & 0x07;
    let mantissa = inverted & 0x0F;
    let step = 4 << (exponent + 1);

    let value = (0x80 << exponent) + step * mantissa + step / 2 - i32::from(ULAW_BIAS);

    if code < 0x80 {
        -value as i16
    } else {
        value as i16
    }
}

/// Width of the A-law quantization interval containing `sample`
pub fn alaw_step(sample: i16) -> u16 {
    let ix = magnitude(sample) >> 4;
    if ix < 32 {
        16
    } else {
        16 << (bit_length(ix) - 5)
    }
}

/// Width of the u-law quantization interval containing `sample`
pub fn ulaw_step(sample: i16) -> u16 {
    let biased = (magnitude(sample) + ULAW_BIAS).min(ULAW_CLIP);
    8 << bit_length(biased >> 8)
}
