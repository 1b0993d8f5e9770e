//! Dot product of an action's features with one column of the sparse
//! Rademacher projection.
//!
//! ```text
//!   dot(action, column) = Σ_f value_f · sparse_rademacher((index_f & mask) + column + seed)
//! ```
//!
//! The scalar kernel is the reference. SIMD kernels handle linear features
//! and quadratic interactions; anything else is evaluated by the scalar
//! kernel. Results agree with the scalar kernel up to summation order.

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(all(feature = "avx512", target_arch = "x86_64"))]
mod avx512;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use las_common::Interaction;
use las_config::SimdHint;
use las_math::{combined_index, sparse_rademacher};
use serde::Serialize;
use tracing::warn;

use crate::features::{for_each_feature, ActionFeatures};

/// Relative tolerance used when comparing SIMD results against the scalar
/// reference.
pub const KERNEL_EQUIVALENCE_EPSILON: f32 = 1e-4;

/// Dot-product implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelBackend {
    Scalar,
    Avx2,
    Avx512,
}

static DETECTED: OnceLock<KernelBackend> = OnceLock::new();

impl KernelBackend {
    /// Best backend the running CPU (and this build) supports. The CPU is
    /// inspected on first use only.
    pub fn detect() -> Self {
        *DETECTED.get_or_init(Self::inspect_cpu)
    }

    fn inspect_cpu() -> Self {
        if avx512_available() {
            KernelBackend::Avx512
        } else if avx2_available() {
            KernelBackend::Avx2
        } else {
            KernelBackend::Scalar
        }
    }

    pub fn from_hint(hint: SimdHint) -> Self {
        match hint {
            SimdHint::Off => KernelBackend::Scalar,
            SimdHint::Auto | SimdHint::Required => Self::detect(),
        }
    }

    pub fn is_simd(self) -> bool {
        self != KernelBackend::Scalar
    }

    /// Whether this backend evaluates every interaction in `interactions`.
    pub fn supports(self, interactions: &[Interaction]) -> bool {
        !self.is_simd() || interactions.iter().all(|i| i.as_quadratic().is_some())
    }

    pub fn name(self) -> &'static str {
        match self {
            KernelBackend::Scalar => "scalar",
            KernelBackend::Avx2 => "avx2",
            KernelBackend::Avx512 => "avx512",
        }
    }
}

impl std::fmt::Display for KernelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(target_arch = "x86_64")]
fn avx2_available() -> bool {
    std::arch::is_x86_feature_detected!("avx2")
}

#[cfg(not(target_arch = "x86_64"))]
fn avx2_available() -> bool {
    false
}

#[cfg(all(feature = "avx512", target_arch = "x86_64"))]
fn avx512_available() -> bool {
    std::arch::is_x86_feature_detected!("avx512f") && std::arch::is_x86_feature_detected!("avx2")
}

#[cfg(not(all(feature = "avx512", target_arch = "x86_64")))]
fn avx512_available() -> bool {
    false
}

// ── Kernel selection ────────────────────────────────────────────────────

/// Backend chosen once per engine, with per-round downgrade to scalar when
/// the round's interactions are outside what SIMD covers.
#[derive(Debug)]
pub struct DotProductKernel {
    preferred: KernelBackend,
    downgrade_logged: AtomicBool,
}

impl DotProductKernel {
    pub fn new(hint: SimdHint) -> Self {
        Self::with_backend(KernelBackend::from_hint(hint))
    }

    pub fn with_backend(preferred: KernelBackend) -> Self {
        Self {
            preferred,
            downgrade_logged: AtomicBool::new(false),
        }
    }

    pub fn preferred(&self) -> KernelBackend {
        self.preferred
    }

    /// Backend to use for a round with these interactions.
    pub fn for_interactions(&self, interactions: &[Interaction]) -> KernelBackend {
        if self.preferred.supports(interactions) {
            return self.preferred;
        }
        if !self.downgrade_logged.swap(true, Ordering::Relaxed) {
            warn!(
                backend = %self.preferred,
                interactions = ?interactions.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "SIMD kernel does not cover these interactions; using scalar kernel"
            );
        }
        KernelBackend::Scalar
    }
}

// ── Entry points ────────────────────────────────────────────────────────

/// Scalar reference kernel.
pub fn compute_dot_prod_scalar(
    features: &ActionFeatures,
    interactions: &[Interaction],
    mask: u64,
    column: u64,
    seed: u64,
) -> f32 {
    let mut sum = 0.0f32;
    for_each_feature(features, interactions, |index, value| {
        sum += value * sparse_rademacher(combined_index(index & mask, column, seed));
    });
    sum
}

/// Best SIMD kernel available on this CPU, scalar otherwise.
pub fn compute_dot_prod_simd(
    features: &ActionFeatures,
    interactions: &[Interaction],
    mask: u64,
    column: u64,
    seed: u64,
) -> f32 {
    compute_dot_prod(KernelBackend::detect(), features, interactions, mask, column, seed)
}

/// Dot product with an explicit backend. Falls back to the scalar kernel when
/// the backend is unavailable or does not cover `interactions`.
pub fn compute_dot_prod(
    backend: KernelBackend,
    features: &ActionFeatures,
    interactions: &[Interaction],
    mask: u64,
    column: u64,
    seed: u64,
) -> f32 {
    let offset = column.wrapping_add(seed);
    let simd = match backend {
        KernelBackend::Scalar => None,
        KernelBackend::Avx2 => dot_prod_avx2(features, interactions, mask, offset),
        KernelBackend::Avx512 => dot_prod_avx512(features, interactions, mask, offset),
    };
    simd.unwrap_or_else(|| compute_dot_prod_scalar(features, interactions, mask, column, seed))
}

#[cfg(target_arch = "x86_64")]
fn dot_prod_avx2(
    features: &ActionFeatures,
    interactions: &[Interaction],
    mask: u64,
    offset: u64,
) -> Option<f32> {
    if avx2_available() {
        // SAFETY: AVX2 support is checked at runtime before calling.
        return unsafe { avx2::dot_prod(features, interactions, mask, offset) };
    }
    None
}

#[cfg(not(target_arch = "x86_64"))]
fn dot_prod_avx2(_: &ActionFeatures, _: &[Interaction], _: u64, _: u64) -> Option<f32> {
    None
}

#[cfg(all(feature = "avx512", target_arch = "x86_64"))]
fn dot_prod_avx512(
    features: &ActionFeatures,
    interactions: &[Interaction],
    mask: u64,
    offset: u64,
) -> Option<f32> {
    if avx512_available() {
        // SAFETY: AVX-512F and AVX2 support is checked at runtime before calling.
        return unsafe { avx512::dot_prod(features, interactions, mask, offset) };
    }
    dot_prod_avx2(features, interactions, mask, offset)
}

#[cfg(not(all(feature = "avx512", target_arch = "x86_64")))]
fn dot_prod_avx512(
    features: &ActionFeatures,
    interactions: &[Interaction],
    mask: u64,
    offset: u64,
) -> Option<f32> {
    dot_prod_avx2(features, interactions, mask, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use las_common::{Example, Namespace};

    fn make_features(len: usize, seed: u64) -> ActionFeatures {
        let mut state = seed;
        let mut next = move || {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            state
        };
        let mut ns = |name: &str, n: usize| {
            let features = (0..n)
                .map(|_| {
                    let idx = next();
                    let value = ((next() >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0;
                    (idx, value)
                })
                .collect();
            Namespace::new(name, features)
        };
        let example = Example::new(vec![ns("a", len), ns("b", len / 2 + 3)]);
        ActionFeatures::merge(None, &example, false)
    }

    fn assert_close(lhs: f32, rhs: f32) {
        let scale = lhs.abs().max(rhs.abs()).max(1.0);
        assert!(
            (lhs - rhs).abs() <= KERNEL_EQUIVALENCE_EPSILON * scale,
            "{lhs} vs {rhs}"
        );
    }

    #[test]
    fn scalar_matches_direct_sum() {
        let example = Example::single("a", vec![(3, 2.0), (8, -1.0)].into());
        let features = ActionFeatures::merge(None, &example, false);
        let expected = 2.0 * sparse_rademacher(3 + 4 + 9) - sparse_rademacher(8 + 4 + 9);
        assert_eq!(compute_dot_prod_scalar(&features, &[], u64::MAX, 4, 9), expected);
    }

    #[test]
    fn mask_applies_before_offset() {
        let example = Example::single("a", vec![(0x1_0000_0005, 1.0)].into());
        let features = ActionFeatures::merge(None, &example, false);
        assert_eq!(
            compute_dot_prod_scalar(&features, &[], 0xff, 2, 0),
            sparse_rademacher(7)
        );
    }

    #[test]
    fn linear_simd_matches_scalar() {
        for len in [1, 4, 7, 33, 128] {
            let features = make_features(len, len as u64);
            for column in 0..6 {
                let scalar = compute_dot_prod_scalar(&features, &[], (1 << 18) - 1, column, 11);
                let simd = compute_dot_prod_simd(&features, &[], (1 << 18) - 1, column, 11);
                assert_close(scalar, simd);
            }
        }
    }

    #[test]
    fn quadratic_simd_matches_scalar() {
        let interactions = vec![Interaction::quadratic(b'a', b'b'), Interaction::quadratic(b'a', b'a')];
        for len in [3, 16, 41] {
            let features = make_features(len, 100 + len as u64);
            for column in [0u64, 1, 0x9E37_79B9] {
                let scalar = compute_dot_prod_scalar(&features, &interactions, u64::MAX, column, 5);
                let simd = compute_dot_prod_simd(&features, &interactions, u64::MAX, column, 5);
                assert_close(scalar, simd);
            }
        }
    }

    #[test]
    fn cubic_falls_back_to_scalar() {
        let features = make_features(9, 3);
        let interactions = vec![Interaction::cubic(b'a', b'b', b'a')];
        let scalar = compute_dot_prod_scalar(&features, &interactions, u64::MAX, 2, 0);
        let simd = compute_dot_prod_simd(&features, &interactions, u64::MAX, 2, 0);
        assert_eq!(scalar, simd);
    }

    #[test]
    fn downgrade_for_unsupported_interactions() {
        let kernel = DotProductKernel::with_backend(KernelBackend::Avx2);
        assert_eq!(
            kernel.for_interactions(&[Interaction::quadratic(b'a', b'b')]),
            KernelBackend::Avx2
        );
        assert_eq!(
            kernel.for_interactions(&[Interaction::cubic(b'a', b'b', b'c')]),
            KernelBackend::Scalar
        );
        assert_eq!(
            kernel.for_interactions(&[Interaction::Extents(vec!["a".into(), "b".into()])]),
            KernelBackend::Scalar
        );
    }

    #[test]
    fn detection_is_cached_and_drives_simd_entry() {
        let first = KernelBackend::detect();
        assert_eq!(DETECTED.get(), Some(&first));
        assert_eq!(KernelBackend::detect(), first);
        assert_eq!(KernelBackend::from_hint(SimdHint::Auto), first);

        let features = make_features(21, 4);
        for column in [0u64, 3, 1 << 33] {
            let via_entry = compute_dot_prod_simd(&features, &[], u64::MAX, column, 11);
            let via_backend = compute_dot_prod(first, &features, &[], u64::MAX, column, 11);
            assert_eq!(via_entry.to_bits(), via_backend.to_bits());
        }
    }

    #[test]
    fn off_hint_is_scalar() {
        assert_eq!(DotProductKernel::new(SimdHint::Off).preferred(), KernelBackend::Scalar);
    }
}
