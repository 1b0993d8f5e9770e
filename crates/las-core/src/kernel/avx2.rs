//! AVX2 kernel: four 64-bit feature indices per step.
//!
//! Per lane, the sparse Rademacher draw is reproduced with integer ops:
//!
//! ```text
//!   combined = ((index ^ key) & mask) + offset
//!   folded   = (combined ^ (combined >> 32)) & 0xffff_ffff
//!   hashed   = (folded · 0x9e3779b1) & 0xffff_ffff
//!   keep     = hashed >> 31
//!   negative = parity(hashed & 0x7fff_ffff)
//! ```
//!
//! `key` is 0 for linear features and `FNV_PRIME · a` for the inner loop of
//! a quadratic term with outer index `a`.

use std::arch::x86_64::*;

use las_common::Interaction;
use las_math::{combined_index, sparse_rademacher, RADEMACHER_MULTIPLIER, RADEMACHER_SIGN_MASK};

use crate::features::{ActionFeatures, FNV_PRIME};

/// Returns `None` if an interaction is not quadratic.
///
/// # Safety
/// The CPU must support AVX2.
#[target_feature(enable = "avx2")]
pub(super) unsafe fn dot_prod(
    features: &ActionFeatures,
    interactions: &[Interaction],
    mask: u64,
    offset: u64,
) -> Option<f32> {
    let mut acc = _mm_setzero_ps();
    let mut tail = 0.0f32;

    for space in features.linear_spaces() {
        accumulate(&mut acc, &mut tail, 0, 1.0, &space.indices, &space.values, mask, offset);
    }

    for interaction in interactions {
        let (a, b) = interaction.as_quadratic()?;
        let (Some(outer), Some(inner)) = (features.space(a), features.space(b)) else {
            continue;
        };
        for pos in 0..outer.len() {
            let key = FNV_PRIME.wrapping_mul(outer.indices[pos]);
            let start = if a == b { pos } else { 0 };
            accumulate(
                &mut acc,
                &mut tail,
                key,
                outer.values[pos],
                &inner.indices[start..],
                &inner.values[start..],
                mask,
                offset,
            );
        }
    }

    let mut lanes = [0.0f32; 4];
    // SAFETY: output buffer has exactly 4 f32 lanes.
    unsafe { _mm_storeu_ps(lanes.as_mut_ptr(), acc) };
    Some(lanes.iter().sum::<f32>() + tail)
}

#[allow(clippy::too_many_arguments)]
#[target_feature(enable = "avx2")]
unsafe fn accumulate(
    acc: &mut __m128,
    tail: &mut f32,
    key: u64,
    scale: f32,
    indices: &[u64],
    values: &[f32],
    mask: u64,
    offset: u64,
) {
    let len = indices.len().min(values.len());
    let key_v = _mm256_set1_epi64x(key as i64);
    let mask_v = _mm256_set1_epi64x(mask as i64);
    let offset_v = _mm256_set1_epi64x(offset as i64);
    let low32 = _mm256_set1_epi64x(0xffff_ffff);
    let multiplier = _mm256_set1_epi64x(i64::from(RADEMACHER_MULTIPLIER));
    let sign_mask = _mm256_set1_epi64x(i64::from(RADEMACHER_SIGN_MASK));
    let one64 = _mm256_set1_epi64x(1);
    let narrow = _mm256_setr_epi32(0, 2, 4, 6, 0, 2, 4, 6);
    let one32 = _mm_set1_epi32(1);
    let scale_v = _mm_set1_ps(scale);

    let mut i = 0usize;
    while i + 4 <= len {
        // SAFETY: loadu supports unaligned access; bounds guarded by loop condition.
        let idx = unsafe { _mm256_loadu_si256(indices.as_ptr().add(i) as *const __m256i) };
        let combined = _mm256_add_epi64(
            _mm256_and_si256(_mm256_xor_si256(idx, key_v), mask_v),
            offset_v,
        );
        let folded = _mm256_and_si256(
            _mm256_xor_si256(combined, _mm256_srli_epi64(combined, 32)),
            low32,
        );
        let hashed = _mm256_and_si256(_mm256_mul_epu32(folded, multiplier), low32);

        let keep = _mm256_srli_epi64(hashed, 31);
        let mut parity = _mm256_and_si256(hashed, sign_mask);
        parity = _mm256_xor_si256(parity, _mm256_srli_epi64(parity, 16));
        parity = _mm256_xor_si256(parity, _mm256_srli_epi64(parity, 8));
        parity = _mm256_xor_si256(parity, _mm256_srli_epi64(parity, 4));
        parity = _mm256_xor_si256(parity, _mm256_srli_epi64(parity, 2));
        parity = _mm256_xor_si256(parity, _mm256_srli_epi64(parity, 1));
        parity = _mm256_and_si256(parity, one64);

        // bit 0: non-zero draw, bit 1: negative draw; one 32-bit code per lane
        let code = _mm256_or_si256(keep, _mm256_slli_epi64(parity, 1));
        let code = _mm256_castsi256_si128(_mm256_permutevar8x32_epi32(code, narrow));
        let keep_mask = _mm_sub_epi32(_mm_setzero_si128(), _mm_and_si128(code, one32));
        let sign_bits = _mm_slli_epi32(_mm_srli_epi32(code, 1), 31);

        // SAFETY: loadu supports unaligned access; bounds guarded by loop condition.
        let vals = unsafe { _mm_loadu_ps(values.as_ptr().add(i)) };
        let signed = _mm_xor_ps(_mm_mul_ps(vals, scale_v), _mm_castsi128_ps(sign_bits));
        *acc = _mm_add_ps(*acc, _mm_and_ps(signed, _mm_castsi128_ps(keep_mask)));
        i += 4;
    }

    for j in i..len {
        let masked = (indices[j] ^ key) & mask;
        *tail += values[j] * scale * sparse_rademacher(combined_index(masked, offset, 0));
    }
}
