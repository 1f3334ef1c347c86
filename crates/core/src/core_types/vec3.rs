//! Vector type aliases for lattice coordinates and vector-valued voxels.

use nalgebra::Vector3;

/// 3D vector type for vector-valued voxels such as smoke velocity.
///
/// This is a simple alias for `nalgebra::Vector3<f32>`, matching the element
/// type of single-precision vector grids.
pub type Vec3 = Vector3<f32>;

/// Integer 3-vector, used for resolution and shift metadata and for bounding boxes.
pub type Vec3i = Vector3<i32>;
