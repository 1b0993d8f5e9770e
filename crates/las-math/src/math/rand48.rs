//! Hash-keyed pseudo-random values.
//!
//! Every value is a pure function of a 64-bit index, so a random matrix can
//! be addressed entry by entry without ever being stored:
//!
//! ```text
//!   merand48:          state = A·state + C  (mod 2^64), float from bits 25..48
//!   gaussian:          polar Box-Muller over merand48, seeded by the index
//!   sparse_rademacher: 0 with probability 1/2, otherwise ±1 by popcount parity
//! ```

/// Multiplier of the 48-bit-quality linear congruential step.
pub const LCG_MULTIPLIER: u64 = 0xeece_66d5_deec_e66d;
/// Increment of the linear congruential step.
pub const LCG_INCREMENT: u64 = 2_147_483_647;
const EXPONENT_BIAS: u32 = 127 << 23;
const MANTISSA_MASK: u64 = 0x7f_ffff;

/// Multiplicative hash applied to the folded index of a Rademacher draw.
pub const RADEMACHER_MULTIPLIER: u32 = 0x9e37_79b1;
/// Bit of the hashed index that decides whether the draw is non-zero.
pub const RADEMACHER_NONZERO_BIT: u32 = 31;
/// Bits of the hashed index whose popcount parity decides the sign.
pub const RADEMACHER_SIGN_MASK: u32 = 0x7fff_ffff;

/// Advance `state` and return a uniform value in `[0, 1)`.
#[inline]
pub fn merand48(state: &mut u64) -> f32 {
    *state = LCG_MULTIPLIER.wrapping_mul(*state).wrapping_add(LCG_INCREMENT);
    let bits = ((*state >> 25) & MANTISSA_MASK) as u32 | EXPONENT_BIAS;
    f32::from_bits(bits) - 1.0
}

/// Standard normal draw (polar Box-Muller) advancing `state`.
pub fn merand48_boxmuller(state: &mut u64) -> f32 {
    loop {
        let x1 = 2.0 * merand48(state) - 1.0;
        let x2 = 2.0 * merand48(state) - 1.0;
        let r = x1 * x1 + x2 * x2;
        if r < 1.0 && r != 0.0 {
            return x1 * ((-2.0 * r.ln()) / r).sqrt();
        }
    }
}

/// Standard normal value keyed by `index`.
#[inline]
pub fn gaussian(index: u64) -> f32 {
    let mut state = index;
    merand48_boxmuller(&mut state)
}

/// Fold a 64-bit index to 32 bits and hash it.
#[inline]
pub fn rademacher_hash(index: u64) -> u32 {
    let folded = (index as u32) ^ ((index >> 32) as u32);
    folded.wrapping_mul(RADEMACHER_MULTIPLIER)
}

/// Sparse Rademacher value keyed by `index`: one of `{0, +1, -1}`.
///
/// SIMD kernels reproduce this with lane-wise integer operations; any change
/// here must be mirrored there.
#[inline]
pub fn sparse_rademacher(index: u64) -> f32 {
    let hashed = rademacher_hash(index);
    if hashed >> RADEMACHER_NONZERO_BIT == 0 {
        return 0.0;
    }
    if (hashed & RADEMACHER_SIGN_MASK).count_ones() & 1 == 0 {
        1.0
    } else {
        -1.0
    }
}
