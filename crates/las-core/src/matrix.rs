//! Explicit sparse action-feature matrix.
//!
//! Row `i` holds the features of action `i` (shared context and
//! interactions included). Columns are the compacted masked feature indices
//! of the round, in ascending order. Features that collide after masking are
//! summed.

use std::collections::BTreeMap;

use nalgebra::DMatrix;

use crate::features::{for_each_feature, FeatureColumns, RoundFeatures};

/// Compressed sparse row matrix over compacted feature columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionMatrix {
    rows: usize,
    columns: FeatureColumns,
    row_offsets: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<f32>,
}

impl ActionMatrix {
    /// Build the matrix for a round. A round without any non-zero feature
    /// yields the empty `0 × 0` matrix.
    pub fn build(round: &RoundFeatures) -> Self {
        if round.columns.is_empty() {
            return Self::empty();
        }
        let mut row_offsets = Vec::with_capacity(round.action_count() + 1);
        let mut col_indices = Vec::new();
        let mut values = Vec::new();
        row_offsets.push(0);

        for action in &round.actions {
            let mut row: BTreeMap<usize, f32> = BTreeMap::new();
            for_each_feature(action, &round.interactions, |index, value| {
                if value == 0.0 {
                    return;
                }
                if let Some(col) = round.columns.ordinal(index & round.feature_mask) {
                    *row.entry(col).or_insert(0.0) += value;
                }
            });
            for (col, value) in row {
                if value != 0.0 {
                    col_indices.push(col);
                    values.push(value);
                }
            }
            row_offsets.push(col_indices.len());
        }

        Self {
            rows: round.action_count(),
            columns: round.columns.clone(),
            row_offsets,
            col_indices,
            values,
        }
    }

    pub fn empty() -> Self {
        Self {
            rows: 0,
            columns: FeatureColumns::default(),
            row_offsets: vec![0],
            col_indices: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns.is_empty()
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn columns(&self) -> &FeatureColumns {
        &self.columns
    }

    /// `(column, value)` pairs of row `i`, columns ascending.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let range = self.row_offsets[i]..self.row_offsets[i + 1];
        self.col_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    pub fn to_dense(&self) -> DMatrix<f32> {
        let mut dense = DMatrix::zeros(self.rows, self.ncols());
        for i in 0..self.rows {
            for (col, value) in self.row(i) {
                dense[(i, col)] = value;
            }
        }
        dense
    }
}
