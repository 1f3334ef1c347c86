//! Named grids: a sparse tree plus per-grid metadata.

use super::stats::value_stats;
use super::tree::Tree;
use crate::core_types::{Blendable, GridValue};
use crate::metadata::{keys, MetaMap};

/// A named sparse field of `T` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    name: String,
    metadata: MetaMap,
    tree: Tree<T>,
}

impl<T: GridValue> Grid<T> {
    /// Empty grid with the given background
    pub fn new(name: impl Into<String>, background: T) -> Self {
        Self::from_tree(name, Tree::new(background))
    }

    pub fn from_tree(name: impl Into<String>, tree: Tree<T>) -> Self {
        Self {
            name: name.into(),
            metadata: MetaMap::new(),
            tree,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn metadata(&self) -> &MetaMap {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MetaMap {
        &mut self.metadata
    }

    pub fn tree(&self) -> &Tree<T> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree<T> {
        &mut self.tree
    }

    pub fn background(&self) -> T {
        self.tree.background()
    }
}

impl<T: Blendable> Grid<T> {
    /// Recompute and attach bounding box, voxel count, memory and value statistics.
    ///
    /// Keys that have no meaning for an empty grid (bounding box, value range)
    /// are removed rather than left stale.
    pub fn add_stats_metadata(&mut self) {
        let voxel_count = i64::try_from(self.tree.active_voxel_count()).unwrap_or(i64::MAX);
        let mem_bytes = i64::try_from(self.tree.mem_bytes()).unwrap_or(i64::MAX);
        self.metadata.insert(keys::FILE_VOXEL_COUNT, voxel_count);
        self.metadata.insert(keys::FILE_MEM_BYTES, mem_bytes);

        match self.tree.active_bbox() {
            Some(bbox) => {
                self.metadata.insert(keys::FILE_BBOX_MIN, bbox.min.to_vec3i());
                self.metadata.insert(keys::FILE_BBOX_MAX, bbox.max.to_vec3i());
            }
            None => {
                self.metadata.remove(keys::FILE_BBOX_MIN);
                self.metadata.remove(keys::FILE_BBOX_MAX);
            }
        }

        match value_stats(&self.tree) {
            Some(stats) => {
                self.metadata.insert(keys::VALUE_MIN, stats.min);
                self.metadata.insert(keys::VALUE_MAX, stats.max);
                self.metadata.insert(keys::VALUE_MEAN, stats.mean as f32);
            }
            None => {
                self.metadata.remove(keys::VALUE_MIN);
                self.metadata.remove(keys::VALUE_MAX);
                self.metadata.remove(keys::VALUE_MEAN);
            }
        }
    }
}
