//! Aggregate statistics over the active values of a tree.

use rayon::prelude::*;

use super::leaf::{LeafNode, LEAF_SIZE};
use super::tree::Tree;
use crate::core_types::Blendable;

/// Min/max/mean of the scalar summary of every active voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueStats {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    pub count: u64,
}

#[derive(Clone, Copy)]
struct Partial {
    min: f32,
    max: f32,
    sum: f64,
    count: u64,
}

impl Partial {
    const EMPTY: Partial = Partial {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
        sum: 0.0,
        count: 0,
    };

    fn add(mut self, v: f32, weight: u64) -> Self {
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        self.sum += f64::from(v) * weight as f64;
        self.count += weight;
        self
    }

    fn merge(self, other: Self) -> Self {
        Partial {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            sum: self.sum + other.sum,
            count: self.count + other.count,
        }
    }
}

fn leaf_partial<T: Blendable>(leaf: &LeafNode<T>) -> Partial {
    leaf.iter_on()
        .fold(Partial::EMPTY, |acc, (_, v)| acc.add(v.scalar_summary(), 1))
}

/// Compute statistics in parallel over leaves; tiles count once per voxel they cover.
///
/// Returns `None` for a tree with no active voxels.
pub fn value_stats<T: Blendable>(tree: &Tree<T>) -> Option<ValueStats> {
    let leaves = tree.leaves();
    let from_leaves = leaves
        .par_iter()
        .map(|leaf| leaf_partial(leaf))
        .reduce(|| Partial::EMPTY, Partial::merge);

    let total = tree
        .tiles()
        .into_iter()
        .fold(from_leaves, |acc, (_, v)| acc.add(v.scalar_summary(), LEAF_SIZE as u64));

    (total.count > 0).then(|| ValueStats {
        min: total.min,
        max: total.max,
        mean: total.sum / total.count as f64,
        count: total.count,
    })
}
