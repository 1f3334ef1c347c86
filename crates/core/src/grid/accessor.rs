//! Cached read accessor.
//!
//! Blending visits coordinates in leaf order, so consecutive lookups almost
//! always land in the same leaf. The accessor remembers the last leaf it
//! resolved and skips the hash lookup while the caller stays inside it.

use std::cell::Cell;

use super::leaf::{LeafNode, LEAF_DIM};
use super::tree::{FieldRead, Tree, ValueOn};
use crate::core_types::{Coord, GridValue};

pub struct ConstAccessor<'a, T> {
    tree: &'a Tree<T>,
    cached: Cell<Option<&'a LeafNode<T>>>,
}

impl<'a, T: GridValue> ConstAccessor<'a, T> {
    pub fn new(tree: &'a Tree<T>) -> Self {
        Self {
            tree,
            cached: Cell::new(None),
        }
    }

    fn leaf(&self, c: Coord) -> Option<&'a LeafNode<T>> {
        let key = c.aligned(LEAF_DIM);
        if let Some(leaf) = self.cached.get() {
            if leaf.origin() == key {
                return Some(leaf);
            }
        }
        let leaf = self.tree.probe_leaf(key)?;
        self.cached.set(Some(leaf));
        Some(leaf)
    }

    pub fn value(&self, c: Coord) -> T {
        match self.leaf(c) {
            Some(leaf) => leaf.value(c),
            None => self.tree.value(c),
        }
    }

    pub fn is_active(&self, c: Coord) -> bool {
        match self.leaf(c) {
            Some(leaf) => leaf.is_on(c),
            None => self.tree.is_active(c),
        }
    }
}

impl<T: GridValue> FieldRead<T> for ConstAccessor<'_, T> {
    fn background(&self) -> T {
        self.tree.background()
    }

    fn value(&self, c: Coord) -> T {
        ConstAccessor::value(self, c)
    }

    fn is_active(&self, c: Coord) -> bool {
        ConstAccessor::is_active(self, c)
    }

    fn iter_value_on(&self) -> Box<dyn Iterator<Item = ValueOn<T>> + '_> {
        Box::new(self.tree.iter_value_on())
    }

    fn coarse_entry_count(&self) -> usize {
        self.tree.tile_count()
    }
}
