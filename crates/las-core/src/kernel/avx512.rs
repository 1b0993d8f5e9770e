//! AVX-512 kernel: eight 64-bit feature indices per step.
//!
//! Same lane arithmetic as the AVX2 kernel; the 64-bit draw codes are
//! narrowed to 32-bit lanes with `vpmovqd` and applied to an 8-wide float
//! accumulator.

use std::arch::x86_64::*;

use las_common::Interaction;
use las_math::{combined_index, sparse_rademacher, RADEMACHER_MULTIPLIER, RADEMACHER_SIGN_MASK};

use crate::features::{ActionFeatures, FNV_PRIME};

/// Returns `None` if an interaction is not quadratic.
///
/// # Safety
/// The CPU must support AVX-512F and AVX2.
#[target_feature(enable = "avx512f,avx2")]
pub(super) unsafe fn dot_prod(
    features: &ActionFeatures,
    interactions: &[Interaction],
    mask: u64,
    offset: u64,
) -> Option<f32> {
    let mut acc = _mm256_setzero_ps();
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

    let mut lanes = [0.0f32; 8];
    // SAFETY: output buffer has exactly 8 f32 lanes.
    unsafe { _mm256_storeu_ps(lanes.as_mut_ptr(), acc) };
    Some(lanes.iter().sum::<f32>() + tail)
}

#[allow(clippy::too_many_arguments)]
#[target_feature(enable = "avx512f,avx2")]
unsafe fn accumulate(
    acc: &mut __m256,
    tail: &mut f32,
    key: u64,
    scale: f32,
    indices: &[u64],
    values: &[f32],
    mask: u64,
    offset: u64,
) {
    let len = indices.len().min(values.len());
    let key_v = _mm512_set1_epi64(key as i64);
    let mask_v = _mm512_set1_epi64(mask as i64);
    let offset_v = _mm512_set1_epi64(offset as i64);
    let low32 = _mm512_set1_epi64(0xffff_ffff);
    let multiplier = _mm512_set1_epi64(i64::from(RADEMACHER_MULTIPLIER));
    let sign_mask = _mm512_set1_epi64(i64::from(RADEMACHER_SIGN_MASK));
    let one64 = _mm512_set1_epi64(1);
    let one32 = _mm256_set1_epi32(1);
    let scale_v = _mm256_set1_ps(scale);

    let mut i = 0usize;
    while i + 8 <= len {
        // SAFETY: loadu supports unaligned access; bounds guarded by loop condition.
        let idx = unsafe { _mm512_loadu_epi64(indices.as_ptr().add(i) as *const i64) };
        let combined = _mm512_add_epi64(
            _mm512_and_si512(_mm512_xor_si512(idx, key_v), mask_v),
            offset_v,
        );
        let folded = _mm512_and_si512(
            _mm512_xor_si512(combined, _mm512_srli_epi64(combined, 32)),
            low32,
        );
        let hashed = _mm512_and_si512(_mm512_mul_epu32(folded, multiplier), low32);

        let keep = _mm512_srli_epi64(hashed, 31);
        let mut parity = _mm512_and_si512(hashed, sign_mask);
        parity = _mm512_xor_si512(parity, _mm512_srli_epi64(parity, 16));
        parity = _mm512_xor_si512(parity, _mm512_srli_epi64(parity, 8));
        parity = _mm512_xor_si512(parity, _mm512_srli_epi64(parity, 4));
        parity = _mm512_xor_si512(parity, _mm512_srli_epi64(parity, 2));
        parity = _mm512_xor_si512(parity, _mm512_srli_epi64(parity, 1));
        parity = _mm512_and_si512(parity, one64);

        let code = _mm512_cvtepi64_epi32(_mm512_or_si512(keep, _mm512_slli_epi64(parity, 1)));
        let keep_mask = _mm256_sub_epi32(_mm256_setzero_si256(), _mm256_and_si256(code, one32));
        let sign_bits = _mm256_slli_epi32(_mm256_srli_epi32(code, 1), 31);

        // SAFETY: loadu supports unaligned access; bounds guarded by loop condition.
        let vals = unsafe { _mm256_loadu_ps(values.as_ptr().add(i)) };
        let signed = _mm256_xor_ps(_mm256_mul_ps(vals, scale_v), _mm256_castsi256_ps(sign_bits));
        *acc = _mm256_add_ps(*acc, _mm256_and_ps(signed, _mm256_castsi256_ps(keep_mask)));
        i += 8;
    }

    for j in i..len {
        let masked = (indices[j] ^ key) & mask;
        *tail += values[j] * scale * sparse_rademacher(combined_index(masked, offset, 0));
    }
}
