//! Sparse feature storage.
//!
//! Features are stored as a structure of arrays: hashed indices in one
//! vector, values in another. Kernels that stream over a namespace can load
//! both contiguously.

use serde::{Deserialize, Serialize};

/// A list of hashed feature indices and their values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(u64, f32)>", into = "Vec<(u64, f32)>")]
pub struct FeatureSpace {
    pub indices: Vec<u64>,
    pub values: Vec<f32>,
}

impl FeatureSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, index: u64, value: f32) {
        self.indices.push(index);
        self.values.push(value);
    }

    /// Append every feature of `other`.
    pub fn extend_from(&mut self, other: &FeatureSpace) {
        self.indices.extend_from_slice(&other.indices);
        self.values.extend_from_slice(&other.values);
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, f32)> + '_ {
        self.indices
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }
}

impl From<Vec<(u64, f32)>> for FeatureSpace {
    fn from(pairs: Vec<(u64, f32)>) -> Self {
        let mut space = FeatureSpace::with_capacity(pairs.len());
        for (index, value) in pairs {
            space.push(index, value);
        }
        space
    }
}

impl From<FeatureSpace> for Vec<(u64, f32)> {
    fn from(space: FeatureSpace) -> Self {
        space.indices.into_iter().zip(space.values).collect()
    }
}

impl FromIterator<(u64, f32)> for FeatureSpace {
    fn from_iter<T: IntoIterator<Item = (u64, f32)>>(iter: T) -> Self {
        let mut space = FeatureSpace::new();
        for (index, value) in iter {
            space.push(index, value);
        }
        space
    }
}

/// A named group of features.
///
/// The namespace index used by single-character interactions is the first
/// byte of the name; the empty name maps to the default namespace `' '`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    #[serde(default)]
    pub features: FeatureSpace,
}

impl Namespace {
    pub const DEFAULT_INDEX: u8 = b' ';

    pub fn new(name: impl Into<String>, features: FeatureSpace) -> Self {
        Self {
            name: name.into(),
            features,
        }
    }

    pub fn index(&self) -> u8 {
        self.name.bytes().next().unwrap_or(Self::DEFAULT_INDEX)
    }
}

/// One example: a context or an action, as a list of namespaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Example {
    #[serde(default)]
    pub namespaces: Vec<Namespace>,
}

impl Example {
    pub fn new(namespaces: Vec<Namespace>) -> Self {
        Self { namespaces }
    }

    /// Convenience constructor for a single-namespace example.
    pub fn single(name: impl Into<String>, features: FeatureSpace) -> Self {
        Self {
            namespaces: vec![Namespace::new(name, features)],
        }
    }

    pub fn feature_count(&self) -> usize {
        self.namespaces.iter().map(|ns| ns.features.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_space_serde_as_pairs() {
        let space: FeatureSpace = vec![(3, 0.5), (9, -1.0)].into();
        let json = serde_json::to_string(&space).unwrap();
        assert_eq!(json, "[[3,0.5],[9,-1.0]]");
        let back: FeatureSpace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, space);
    }

    #[test]
    fn namespace_index_from_name() {
        assert_eq!(Namespace::new("user", FeatureSpace::new()).index(), b'u');
        assert_eq!(
            Namespace::new("", FeatureSpace::new()).index(),
            Namespace::DEFAULT_INDEX
        );
    }

    #[test]
    fn example_counts_features() {
        let ex = Example::new(vec![
            Namespace::new("a", vec![(1, 1.0), (2, 1.0)].into()),
            Namespace::new("b", vec![(3, 1.0)].into()),
        ]);
        assert_eq!(ex.feature_count(), 3);
    }
}
