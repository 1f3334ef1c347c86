//! Sparse volumetric tree.
//!
//! Storage is two-level: a root hash table of 8³ [`LeafNode`]s keyed by leaf
//! origin, plus a table of tiles. A tile is a coarse active region covering a
//! whole leaf-sized block with a single value and no per-voxel storage.
//!
//! Every coordinate is either inactive (reads as background) or active. Tiles
//! and leaves never share a block: writing a single voxel inside a tile first
//! densifies the tile into a fully active leaf.

use std::mem::size_of;

use rustc_hash::FxHashMap;

use super::leaf::{LeafNode, LEAF_DIM, LEAF_SIZE};
use crate::core_types::{Coord, CoordBBox, GridValue};

/// What an enumeration entry stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A single point sample
    Voxel,
    /// A constant region of `dim`³ voxels starting at the entry coordinate
    Tile { dim: i32 },
}

/// One entry of an active-value enumeration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueOn<T> {
    pub coord: Coord,
    pub value: T,
    pub kind: EntryKind,
}

impl<T> ValueOn<T> {
    /// True when the entry is a genuine point sample rather than a tile
    #[inline]
    pub fn is_voxel(&self) -> bool {
        self.kind == EntryKind::Voxel
    }
}

enum NodeRef<'a, T> {
    Leaf(&'a LeafNode<T>),
    Tile(Coord, T),
}

impl<'a, T: GridValue> NodeRef<'a, T> {
    fn entries(self) -> Box<dyn Iterator<Item = ValueOn<T>> + 'a> {
        match self {
            NodeRef::Leaf(leaf) => Box::new(leaf.iter_on().map(|(coord, value)| ValueOn {
                coord,
                value,
                kind: EntryKind::Voxel,
            })),
            NodeRef::Tile(coord, value) => Box::new(std::iter::once(ValueOn {
                coord,
                value,
                kind: EntryKind::Tile { dim: LEAF_DIM },
            })),
        }
    }
}

/// Read side of the sparse field contract the blend engine depends on.
pub trait FieldRead<T: GridValue> {
    /// Value assumed at every inactive coordinate
    fn background(&self) -> T;

    /// Stored value if `c` is active, background otherwise
    fn value(&self, c: Coord) -> T;

    fn is_active(&self, c: Coord) -> bool;

    /// Lazy, restartable enumeration of active entries, including tiles.
    ///
    /// Order is stable for an unmodified field. Callers that need point
    /// samples only must filter with [`ValueOn::is_voxel`].
    fn iter_value_on(&self) -> Box<dyn Iterator<Item = ValueOn<T>> + '_>;

    /// Number of non-voxel (tile) entries [`Self::iter_value_on`] yields
    fn coarse_entry_count(&self) -> usize {
        self.iter_value_on().filter(|e| !e.is_voxel()).count()
    }
}

/// Write side of the sparse field contract.
pub trait FieldWrite<T: GridValue>: FieldRead<T> {
    /// Store `value` at `c` and mark it active
    fn set_value_on(&mut self, c: Coord, value: T);

    /// Visit every active point sample with write access to its value.
    ///
    /// Activation is left untouched and tiles are not visited.
    fn for_each_voxel_on_mut(&mut self, f: &mut dyn FnMut(Coord, &mut T));
}

/// Sparse 3D lattice of `T` values with an implicit background.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree<T> {
    background: T,
    leaves: FxHashMap<Coord, LeafNode<T>>,
    tiles: FxHashMap<Coord, T>,
}

impl<T: GridValue> Tree<T> {
    pub fn new(background: T) -> Self {
        Self {
            background,
            leaves: FxHashMap::default(),
            tiles: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn background(&self) -> T {
        self.background
    }

    /// Leaf containing `c`, if one is allocated
    #[inline]
    pub fn probe_leaf(&self, c: Coord) -> Option<&LeafNode<T>> {
        self.leaves.get(&c.aligned(LEAF_DIM))
    }

    pub fn value(&self, c: Coord) -> T {
        let key = c.aligned(LEAF_DIM);
        if let Some(leaf) = self.leaves.get(&key) {
            return leaf.value(c);
        }
        self.tiles.get(&key).copied().unwrap_or(self.background)
    }

    pub fn is_active(&self, c: Coord) -> bool {
        let key = c.aligned(LEAF_DIM);
        match self.leaves.get(&key) {
            Some(leaf) => leaf.is_on(c),
            None => self.tiles.contains_key(&key),
        }
    }

    /// Replace a tile covering `key` with an equivalent fully active leaf.
    fn densify(&mut self, key: Coord) {
        if let Some(value) = self.tiles.remove(&key) {
            self.leaves.insert(key, LeafNode::new_active(key, value));
        }
    }

    pub fn set_value_on(&mut self, c: Coord, value: T) {
        let key = c.aligned(LEAF_DIM);
        self.densify(key);
        let background = self.background;
        self.leaves
            .entry(key)
            .or_insert_with(|| LeafNode::new(key, background))
            .set_value_on(c, value);
    }

    /// Deactivate `c`. The leaf is kept even if it becomes empty; see
    /// [`Self::prune_inactive`].
    pub fn set_value_off(&mut self, c: Coord) {
        let key = c.aligned(LEAF_DIM);
        self.densify(key);
        let background = self.background;
        if let Some(leaf) = self.leaves.get_mut(&key) {
            leaf.set_value_off(c, background);
        }
    }

    /// Make the whole leaf-sized block containing `c` a single active tile,
    /// discarding any voxels stored there.
    pub fn fill_tile(&mut self, c: Coord, value: T) {
        let key = c.aligned(LEAF_DIM);
        self.leaves.remove(&key);
        self.tiles.insert(key, value);
    }

    /// Expand every tile into a leaf of active voxels. Returns the number of
    /// tiles expanded.
    pub fn voxelize_active_tiles(&mut self) -> usize {
        let tiles: Vec<(Coord, T)> = self.tiles.drain().collect();
        let count = tiles.len();
        for (key, value) in tiles {
            self.leaves.insert(key, LeafNode::new_active(key, value));
        }
        count
    }

    /// Drop leaves with no active voxels. Returns the number of leaves removed.
    pub fn prune_inactive(&mut self) -> usize {
        let before = self.leaves.len();
        self.leaves.retain(|_, leaf| !leaf.is_empty());
        before - self.leaves.len()
    }

    /// Install a prebuilt leaf, replacing whatever occupied its block.
    pub fn insert_leaf(&mut self, leaf: LeafNode<T>) {
        let key = leaf.origin();
        self.tiles.remove(&key);
        self.leaves.insert(key, leaf);
    }

    /// Leaves in ascending origin order
    pub fn leaves(&self) -> Vec<&LeafNode<T>> {
        let mut leaves: Vec<&LeafNode<T>> = self.leaves.values().collect();
        leaves.sort_unstable_by_key(|leaf| leaf.origin());
        leaves
    }

    /// Tiles as (origin, value) in ascending origin order
    pub fn tiles(&self) -> Vec<(Coord, T)> {
        let mut tiles: Vec<(Coord, T)> = self.tiles.iter().map(|(k, v)| (*k, *v)).collect();
        tiles.sort_unstable_by_key(|(k, _)| *k);
        tiles
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// True when nothing is active
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty() && self.leaves.values().all(LeafNode::is_empty)
    }

    /// Number of active voxels, counting each tile as all the voxels it covers
    pub fn active_voxel_count(&self) -> u64 {
        let in_leaves: usize = self.leaves.values().map(LeafNode::on_count).sum();
        (in_leaves + self.tiles.len() * LEAF_SIZE) as u64
    }

    /// Bounding box of all active voxels, tiles included
    pub fn active_bbox(&self) -> Option<CoordBBox> {
        let voxels = self
            .leaves
            .values()
            .flat_map(|leaf| leaf.iter_on().map(|(c, _)| CoordBBox::from_coord(c)));
        let tiles = self.tiles.keys().map(|key| {
            CoordBBox::new(*key, key.offset_by(LEAF_DIM - 1, LEAF_DIM - 1, LEAF_DIM - 1))
        });
        voxels.chain(tiles).reduce(|mut acc, b| {
            acc.union(&b);
            acc
        })
    }

    /// Approximate heap plus inline footprint in bytes
    pub fn mem_bytes(&self) -> u64 {
        let leaf_bytes = size_of::<Coord>() + size_of::<LeafNode<T>>() + LEAF_SIZE * size_of::<T>();
        let tile_bytes = size_of::<Coord>() + size_of::<T>();
        (size_of::<Self>() + self.leaves.len() * leaf_bytes + self.tiles.len() * tile_bytes) as u64
    }

    /// Lazy enumeration of active entries in ascending node order.
    ///
    /// Voxels inside a leaf come out in leaf offset order; each tile is a
    /// single [`EntryKind::Tile`] entry at the tile origin.
    pub fn iter_value_on(&self) -> impl Iterator<Item = ValueOn<T>> + '_ {
        let mut nodes: Vec<(Coord, NodeRef<'_, T>)> = self
            .leaves
            .iter()
            .map(|(k, leaf)| (*k, NodeRef::Leaf(leaf)))
            .chain(self.tiles.iter().map(|(k, v)| (*k, NodeRef::Tile(*k, *v))))
            .collect();
        nodes.sort_unstable_by_key(|(k, _)| *k);
        nodes.into_iter().flat_map(|(_, node)| node.entries())
    }

    /// Active point samples only
    pub fn iter_voxels_on(&self) -> impl Iterator<Item = ValueOn<T>> + '_ {
        self.iter_value_on().filter(ValueOn::is_voxel)
    }
}

impl<T: GridValue> FieldRead<T> for Tree<T> {
    fn background(&self) -> T {
        self.background
    }

    fn value(&self, c: Coord) -> T {
        Tree::value(self, c)
    }

    fn is_active(&self, c: Coord) -> bool {
        Tree::is_active(self, c)
    }

    fn iter_value_on(&self) -> Box<dyn Iterator<Item = ValueOn<T>> + '_> {
        Box::new(Tree::iter_value_on(self))
    }

    fn coarse_entry_count(&self) -> usize {
        self.tiles.len()
    }
}

impl<T: GridValue> FieldWrite<T> for Tree<T> {
    fn set_value_on(&mut self, c: Coord, value: T) {
        Tree::set_value_on(self, c, value);
    }

    fn for_each_voxel_on_mut(&mut self, f: &mut dyn FnMut(Coord, &mut T)) {
        for leaf in self.leaves.values_mut() {
            leaf.for_each_on_mut(&mut *f);
        }
    }
}
