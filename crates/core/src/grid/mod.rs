//! Sparse volumetric grids

pub mod accessor;
pub mod any_grid;
#[allow(clippy::module_inception)]
pub mod grid;
pub mod leaf;
pub mod stats;
pub mod tree;

// Re-export main types
pub use accessor::ConstAccessor;
pub use any_grid::{AnyGrid, GridType};
pub use grid::Grid;
pub use leaf::{LeafNode, ValueMask, LEAF_DIM, LEAF_LOG2DIM, LEAF_SIZE};
pub use stats::{value_stats, ValueStats};
pub use tree::{EntryKind, FieldRead, FieldWrite, Tree, ValueOn};
