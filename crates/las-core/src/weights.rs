//! Weight storage shared by the regressor and the model-weight SVD.
//!
//! Every masked feature index owns `2^stride_shift` consecutive slots:
//!
//! ```text
//!   slot(feature, offset) = ((feature & mask) << stride_shift) + offset
//! ```
//!
//! Slot 0 belongs to the regressor. Higher offsets are free for scratch use.

use std::collections::HashMap;
use std::ops::Range;

use las_common::{Error, Result};
use las_config::LearnerConfig;

#[derive(Debug, Clone)]
enum Storage {
    Dense(Vec<f32>),
    Sparse(HashMap<u64, f32>),
}

/// Dense array or hash-map weight storage.
#[derive(Debug, Clone)]
pub struct WeightStore {
    storage: Storage,
    num_bits: u32,
    stride_shift: u32,
}

impl WeightStore {
    pub fn new(config: &LearnerConfig) -> Self {
        if config.sparse_weights {
            Self::sparse(config.num_bits, config.stride_shift)
        } else {
            Self::dense(config.num_bits, config.stride_shift)
        }
    }

    pub fn dense(num_bits: u32, stride_shift: u32) -> Self {
        Self {
            storage: Storage::Dense(vec![0.0; 1usize << (num_bits + stride_shift)]),
            num_bits,
            stride_shift,
        }
    }

    pub fn sparse(num_bits: u32, stride_shift: u32) -> Self {
        Self {
            storage: Storage::Sparse(HashMap::new()),
            num_bits,
            stride_shift,
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self.storage, Storage::Sparse(_))
    }

    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    pub fn stride_shift(&self) -> u32 {
        self.stride_shift
    }

    /// Slots per feature.
    pub fn stride(&self) -> u32 {
        1 << self.stride_shift
    }

    /// Mask applied to raw feature indices before any slot lookup.
    pub fn feature_mask(&self) -> u64 {
        (1u64 << self.num_bits) - 1
    }

    #[inline]
    pub fn slot(&self, feature: u64, offset: u32) -> u64 {
        ((feature & self.feature_mask()) << self.stride_shift) + u64::from(offset)
    }

    #[inline]
    pub fn get(&self, feature: u64, offset: u32) -> f32 {
        let slot = self.slot(feature, offset);
        match &self.storage {
            Storage::Dense(values) => values[slot as usize],
            Storage::Sparse(values) => values.get(&slot).copied().unwrap_or(0.0),
        }
    }

    #[inline]
    pub fn set(&mut self, feature: u64, offset: u32, value: f32) {
        let slot = self.slot(feature, offset);
        match &mut self.storage {
            Storage::Dense(values) => values[slot as usize] = value,
            Storage::Sparse(values) => {
                if value == 0.0 {
                    values.remove(&slot);
                } else {
                    values.insert(slot, value);
                }
            }
        }
    }

    #[inline]
    pub fn add(&mut self, feature: u64, offset: u32, delta: f32) {
        let slot = self.slot(feature, offset);
        match &mut self.storage {
            Storage::Dense(values) => values[slot as usize] += delta,
            Storage::Sparse(values) => *values.entry(slot).or_insert(0.0) += delta,
        }
    }

    /// Number of non-zero slots whose offset falls in `offsets`.
    pub fn count_nonzero(&self, offsets: Range<u32>) -> usize {
        let stride_mask = u64::from(self.stride()) - 1;
        let in_range = |slot: u64| offsets.contains(&((slot & stride_mask) as u32));
        match &self.storage {
            Storage::Dense(values) => values
                .iter()
                .enumerate()
                .filter(|(slot, v)| **v != 0.0 && in_range(*slot as u64))
                .count(),
            Storage::Sparse(values) => values
                .iter()
                .filter(|(slot, v)| **v != 0.0 && in_range(**slot))
                .count(),
        }
    }

    /// Borrow `width` slots starting at `offset` for every feature in
    /// `features`. The slots are zeroed when the region is dropped.
    pub fn scratch(
        &mut self,
        offset: u32,
        width: usize,
        features: Vec<u64>,
    ) -> Result<ScratchRegion<'_>> {
        let end = u64::from(offset) + width as u64;
        if offset == 0 || end > u64::from(self.stride()) {
            return Err(Error::Config(format!(
                "scratch slots {offset}..{end} do not fit in a stride of {} (slot 0 is reserved)",
                self.stride()
            )));
        }
        Ok(ScratchRegion {
            weights: self,
            offset,
            width: width as u32,
            features,
        })
    }
}

// ── Scratch region ──────────────────────────────────────────────────────

/// Temporary use of spare weight slots as a dense `features × width` matrix.
///
/// Column `j` of feature `f` lives in slot `slot(f, offset + j)`.
#[derive(Debug)]
pub struct ScratchRegion<'a> {
    weights: &'a mut WeightStore,
    offset: u32,
    width: u32,
    features: Vec<u64>,
}

impl ScratchRegion<'_> {
    pub fn width(&self) -> usize {
        self.width as usize
    }

    pub fn features(&self) -> &[u64] {
        &self.features
    }

    #[inline]
    pub fn get(&self, feature: u64, column: usize) -> f32 {
        self.weights.get(feature, self.offset + column as u32)
    }

    #[inline]
    pub fn set(&mut self, feature: u64, column: usize, value: f32) {
        self.weights.set(feature, self.offset + column as u32, value);
    }

    #[inline]
    pub fn add(&mut self, feature: u64, column: usize, delta: f32) {
        self.weights.add(feature, self.offset + column as u32, delta);
    }

    /// Zero every scratch slot of every registered feature.
    pub fn clear(&mut self) {
        for i in 0..self.features.len() {
            let feature = self.features[i];
            for j in 0..self.width {
                self.weights.set(feature, self.offset + j, 0.0);
            }
        }
    }
}

impl Drop for ScratchRegion<'_> {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_layout() {
        let w = WeightStore::dense(4, 2);
        assert_eq!(w.feature_mask(), 15);
        assert_eq!(w.slot(3, 1), 13);
        // masked before shifting
        assert_eq!(w.slot(19, 0), w.slot(3, 0));
    }

    #[test]
    fn dense_and_sparse_agree() {
        for mut w in [WeightStore::dense(6, 2), WeightStore::sparse(6, 2)] {
            w.set(5, 0, 1.5);
            w.add(5, 0, 0.5);
            w.add(9, 2, -1.0);
            assert_eq!(w.get(5, 0), 2.0);
            assert_eq!(w.get(9, 2), -1.0);
            assert_eq!(w.get(9, 1), 0.0);
            assert_eq!(w.count_nonzero(0..1), 1);
            assert_eq!(w.count_nonzero(1..4), 1);
        }
    }

    #[test]
    fn scratch_is_zeroed_on_drop() {
        for mut w in [WeightStore::dense(6, 2), WeightStore::sparse(6, 2)] {
            w.set(7, 0, 3.0);
            {
                let mut scratch = w.scratch(1, 3, vec![7, 11]).unwrap();
                scratch.set(7, 0, 1.0);
                scratch.add(11, 2, 4.0);
                assert_eq!(scratch.get(11, 2), 4.0);
            }
            assert_eq!(w.count_nonzero(1..4), 0);
            assert_eq!(w.get(7, 0), 3.0);
        }
    }

    #[test]
    fn scratch_must_fit_stride() {
        let mut w = WeightStore::dense(4, 2);
        assert!(w.scratch(0, 2, vec![]).is_err());
        assert!(w.scratch(1, 4, vec![]).is_err());
        assert!(w.scratch(1, 3, vec![]).is_ok());
    }
}
