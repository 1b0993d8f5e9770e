//! Per-action feature views and interaction expansion.
//!
//! An [`ActionFeatures`] merges the shared context into one action, grouped
//! by namespace index (and, when extent interactions are in play, by full
//! namespace name). [`for_each_feature`] streams the linear features followed
//! by every interaction term:
//!
//! ```text
//!   index(a, b)    = (FNV_PRIME · a) ^ b
//!   index(a, b, c) = (FNV_PRIME · index(a, b)) ^ c
//!   value          = product of the term values
//! ```

use std::collections::BTreeMap;

use las_common::{ActionBatch, Example, FeatureSpace, Interaction};

/// Multiplier used to combine interacted feature indices.
pub const FNV_PRIME: u64 = 16_777_619;

/// Combine an interacted prefix hash with the next term's index.
#[inline]
pub fn interact(prefix: u64, index: u64) -> u64 {
    FNV_PRIME.wrapping_mul(prefix) ^ index
}

/// One action's features with the shared context merged in.
#[derive(Debug, Clone, Default)]
pub struct ActionFeatures {
    by_index: BTreeMap<u8, FeatureSpace>,
    by_name: BTreeMap<String, FeatureSpace>,
}

impl ActionFeatures {
    /// Merge `shared` (if any) and `action`. Name grouping is only built when
    /// `with_extents` is set.
    pub fn merge(shared: Option<&Example>, action: &Example, with_extents: bool) -> Self {
        let mut merged = ActionFeatures::default();
        for example in shared.into_iter().chain(std::iter::once(action)) {
            for ns in &example.namespaces {
                merged
                    .by_index
                    .entry(ns.index())
                    .or_default()
                    .extend_from(&ns.features);
                if with_extents {
                    merged
                        .by_name
                        .entry(ns.name.clone())
                        .or_default()
                        .extend_from(&ns.features);
                }
            }
        }
        merged
    }

    /// Namespaces in ascending index order.
    pub fn linear_spaces(&self) -> impl Iterator<Item = &FeatureSpace> {
        self.by_index.values()
    }

    pub fn space(&self, index: u8) -> Option<&FeatureSpace> {
        self.by_index.get(&index)
    }

    pub fn extent(&self, name: &str) -> Option<&FeatureSpace> {
        self.by_name.get(name)
    }

    pub fn linear_len(&self) -> usize {
        self.by_index.values().map(FeatureSpace::len).sum()
    }
}

/// Visit every `(index, value)` of an action: linear features first, then
/// each interaction in order. Indices are not masked.
pub fn for_each_feature<F>(features: &ActionFeatures, interactions: &[Interaction], mut f: F)
where
    F: FnMut(u64, f32),
{
    for space in features.linear_spaces() {
        for (index, value) in space.iter() {
            f(index, value);
        }
    }
    for interaction in interactions {
        match interaction {
            Interaction::Namespaces(terms) => {
                let spaces: Option<Vec<&FeatureSpace>> =
                    terms.iter().map(|t| features.space(*t)).collect();
                if let Some(spaces) = spaces {
                    let same: Vec<bool> = (0..terms.len())
                        .map(|i| i > 0 && terms[i] == terms[i - 1])
                        .collect();
                    expand(&spaces, &same, 0, 0, 0, 1.0, &mut f);
                }
            }
            Interaction::Extents(names) => {
                let spaces: Option<Vec<&FeatureSpace>> =
                    names.iter().map(|n| features.extent(n)).collect();
                if let Some(spaces) = spaces {
                    let same: Vec<bool> = (0..names.len())
                        .map(|i| i > 0 && names[i] == names[i - 1])
                        .collect();
                    expand(&spaces, &same, 0, 0, 0, 1.0, &mut f);
                }
            }
        }
    }
}

fn expand<F>(
    spaces: &[&FeatureSpace],
    same: &[bool],
    depth: usize,
    start: usize,
    prefix: u64,
    value: f32,
    f: &mut F,
) where
    F: FnMut(u64, f32),
{
    let space = spaces[depth];
    let begin = if same[depth] { start } else { 0 };
    let last = depth + 1 == spaces.len();
    for pos in begin..space.len() {
        let (index, v) = (space.indices[pos], space.values[pos]);
        let (hash, product) = if depth == 0 {
            (index, v)
        } else {
            (interact(prefix, index), value * v)
        };
        if last {
            f(hash, product);
        } else {
            expand(spaces, same, depth + 1, pos, hash, product, f);
        }
    }
}

// ── Round features ──────────────────────────────────────────────────────

/// Sorted masked feature indices that carry a non-zero value in some action.
///
/// The position of an index in this list is its compacted column ordinal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureColumns {
    indices: Vec<u64>,
}

impl FeatureColumns {
    pub fn collect(actions: &[ActionFeatures], interactions: &[Interaction], mask: u64) -> Self {
        let mut indices = Vec::new();
        for action in actions {
            for_each_feature(action, interactions, |index, value| {
                if value != 0.0 {
                    indices.push(index & mask);
                }
            });
        }
        indices.sort_unstable();
        indices.dedup();
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Column ordinal of a masked feature index.
    pub fn ordinal(&self, masked: u64) -> Option<usize> {
        self.indices.binary_search(&masked).ok()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.indices
    }
}

/// Everything the round computation needs about a batch's features.
#[derive(Debug, Clone)]
pub struct RoundFeatures {
    pub actions: Vec<ActionFeatures>,
    pub interactions: Vec<Interaction>,
    pub columns: FeatureColumns,
    pub feature_mask: u64,
}

impl RoundFeatures {
    pub fn build(batch: &ActionBatch, interactions: Vec<Interaction>, feature_mask: u64) -> Self {
        let with_extents = interactions.iter().any(Interaction::is_extent);
        let actions: Vec<ActionFeatures> = batch
            .actions
            .iter()
            .map(|a| ActionFeatures::merge(batch.shared.as_ref(), a, with_extents))
            .collect();
        let columns = FeatureColumns::collect(&actions, &interactions, feature_mask);
        Self {
            actions,
            interactions,
            columns,
            feature_mask,
        }
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use las_common::Namespace;

    fn collect(features: &ActionFeatures, interactions: &[Interaction]) -> Vec<(u64, f32)> {
        let mut out = Vec::new();
        for_each_feature(features, interactions, |i, v| out.push((i, v)));
        out
    }

    #[test]
    fn shared_context_is_merged() {
        let shared = Example::single("user", vec![(1, 1.0)].into());
        let action = Example::single("item", vec![(2, 0.5)].into());
        let features = ActionFeatures::merge(Some(&shared), &action, false);
        assert_eq!(collect(&features, &[]), vec![(2, 0.5), (1, 1.0)]);
    }

    #[test]
    fn quadratic_interaction_hashes_and_multiplies() {
        let action = Example::new(vec![
            Namespace::new("a", vec![(3, 2.0)].into()),
            Namespace::new("b", vec![(5, 0.5), (7, 1.5)].into()),
        ]);
        let features = ActionFeatures::merge(None, &action, false);
        let out = collect(&features, &[Interaction::quadratic(b'a', b'b')]);
        assert_eq!(out.len(), 5);
        assert_eq!(out[3], (FNV_PRIME * 3 ^ 5, 1.0));
        assert_eq!(out[4], (FNV_PRIME * 3 ^ 7, 3.0));
    }

    #[test]
    fn self_interaction_skips_permutations() {
        let action = Example::single("a", vec![(1, 1.0), (2, 1.0), (3, 1.0)].into());
        let features = ActionFeatures::merge(None, &action, false);
        let out = collect(&features, &[Interaction::quadratic(b'a', b'a')]);
        // 3 linear + 6 pairs (i <= j)
        assert_eq!(out.len(), 9);
    }

    #[test]
    fn cubic_interaction_folds_three_terms() {
        let action = Example::new(vec![
            Namespace::new("a", vec![(1, 2.0)].into()),
            Namespace::new("b", vec![(2, 3.0)].into()),
            Namespace::new("c", vec![(3, 4.0)].into()),
        ]);
        let features = ActionFeatures::merge(None, &action, false);
        let out = collect(&features, &[Interaction::cubic(b'a', b'b', b'c')]);
        let expected = interact(interact(1, 2), 3);
        assert_eq!(out.last(), Some(&(expected, 24.0)));
    }

    #[test]
    fn extent_interaction_uses_full_names() {
        let action = Example::new(vec![
            Namespace::new("user", vec![(1, 1.0)].into()),
            Namespace::new("uber", vec![(9, 1.0)].into()),
            Namespace::new("item", vec![(2, 2.0)].into()),
        ]);
        let features = ActionFeatures::merge(None, &action, true);
        let out = collect(
            &features,
            &[Interaction::Extents(vec!["user".into(), "item".into()])],
        );
        assert_eq!(out.last(), Some(&(interact(1, 2), 2.0)));
        // "user" and "uber" share index 'u' for linear grouping
        assert_eq!(features.space(b'u').map(FeatureSpace::len), Some(2));
    }

    #[test]
    fn missing_namespace_contributes_nothing() {
        let action = Example::single("a", vec![(1, 1.0)].into());
        let features = ActionFeatures::merge(None, &action, false);
        assert_eq!(collect(&features, &[Interaction::quadratic(b'a', b'z')]).len(), 1);
    }

    #[test]
    fn columns_are_sorted_masked_and_nonzero() {
        let batch = ActionBatch::new(
            None,
            vec![
                Example::single("a", vec![(17, 1.0), (3, 0.0)].into()),
                Example::single("a", vec![(1, 2.0), (33, 1.0)].into()),
            ],
        );
        let round = RoundFeatures::build(&batch, vec![], 15);
        // 17, 1 and 33 all mask to 1; index 3 only carries a zero value
        assert_eq!(round.columns.as_slice(), &[1]);
        assert_eq!(round.columns.ordinal(1), Some(0));
        assert_eq!(round.columns.ordinal(3), None);
    }
}
