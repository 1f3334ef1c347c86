//! Integer lattice coordinates and bounding boxes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::vec3::Vec3i;

/// A point on the unbounded integer voxel lattice.
///
/// Ordering is lexicographic on (x, y, z), which is the order sparse trees
/// enumerate their nodes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord {
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Round every component down to a multiple of `dim`, which must be a power of two.
    ///
    /// Works for negative coordinates: `-1` aligned to 8 is `-8`.
    #[inline]
    #[must_use]
    pub const fn aligned(self, dim: i32) -> Self {
        let mask = !(dim - 1);
        Self::new(self.x & mask, self.y & mask, self.z & mask)
    }

    #[inline]
    #[must_use]
    pub const fn offset_by(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    #[must_use]
    pub fn component_min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    #[must_use]
    pub fn component_max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    #[must_use]
    pub fn to_vec3i(self) -> Vec3i {
        Vec3i::new(self.x, self.y, self.z)
    }
}

impl From<(i32, i32, i32)> for Coord {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Vec3i> for Coord {
    fn from(v: Vec3i) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Inclusive axis-aligned box of lattice coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordBBox {
    pub min: Coord,
    pub max: Coord,
}

impl CoordBBox {
    #[must_use]
    pub const fn new(min: Coord, max: Coord) -> Self {
        Self { min, max }
    }

    /// Box covering exactly one coordinate
    #[must_use]
    pub const fn from_coord(c: Coord) -> Self {
        Self { min: c, max: c }
    }

    /// Grow the box so that it contains `c`
    pub fn expand(&mut self, c: Coord) {
        self.min = self.min.component_min(c);
        self.max = self.max.component_max(c);
    }

    /// Grow the box so that it contains `other`
    pub fn union(&mut self, other: &Self) {
        self.expand(other.min);
        self.expand(other.max);
    }

    #[must_use]
    pub fn contains(&self, c: Coord) -> bool {
        (self.min.x..=self.max.x).contains(&c.x)
            && (self.min.y..=self.max.y).contains(&c.y)
            && (self.min.z..=self.max.z).contains(&c.z)
    }
}
