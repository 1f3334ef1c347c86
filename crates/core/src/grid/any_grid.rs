//! Runtime-typed grids.
//!
//! Files hold grids of several element types side by side. `AnyGrid` carries
//! the type as a tag so callers can dispatch without knowing it statically.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::grid::Grid;
use crate::core_types::{GridValue, Vec3};
use crate::metadata::MetaMap;

/// Element type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridType {
    Float,
    Vec3s,
    Int32,
}

impl GridType {
    pub fn name(self) -> &'static str {
        match self {
            GridType::Float => f32::TYPE_NAME,
            GridType::Vec3s => Vec3::TYPE_NAME,
            GridType::Int32 => i32::TYPE_NAME,
        }
    }

    /// Whether grids of this type can be interpolated
    pub fn is_blendable(self) -> bool {
        matches!(self, GridType::Float | GridType::Vec3s)
    }
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A grid of any supported element type.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyGrid {
    Float(Grid<f32>),
    Vec3(Grid<Vec3>),
    Int32(Grid<i32>),
}

macro_rules! with_grid {
    ($self:expr, $g:ident => $body:expr) => {
        match $self {
            AnyGrid::Float($g) => $body,
            AnyGrid::Vec3($g) => $body,
            AnyGrid::Int32($g) => $body,
        }
    };
}

impl AnyGrid {
    pub fn grid_type(&self) -> GridType {
        match self {
            AnyGrid::Float(_) => GridType::Float,
            AnyGrid::Vec3(_) => GridType::Vec3s,
            AnyGrid::Int32(_) => GridType::Int32,
        }
    }

    pub fn name(&self) -> &str {
        with_grid!(self, g => g.name())
    }

    pub fn metadata(&self) -> &MetaMap {
        with_grid!(self, g => g.metadata())
    }

    pub fn metadata_mut(&mut self) -> &mut MetaMap {
        with_grid!(self, g => g.metadata_mut())
    }

    pub fn active_voxel_count(&self) -> u64 {
        with_grid!(self, g => g.tree().active_voxel_count())
    }

    /// Expand tiles into voxels. Returns the number of tiles expanded.
    pub fn voxelize_active_tiles(&mut self) -> usize {
        with_grid!(self, g => g.tree_mut().voxelize_active_tiles())
    }
}

impl From<Grid<f32>> for AnyGrid {
    fn from(g: Grid<f32>) -> Self {
        AnyGrid::Float(g)
    }
}

impl From<Grid<Vec3>> for AnyGrid {
    fn from(g: Grid<Vec3>) -> Self {
        AnyGrid::Vec3(g)
    }
}

impl From<Grid<i32>> for AnyGrid {
    fn from(g: Grid<i32>) -> Self {
        AnyGrid::Int32(g)
    }
}
