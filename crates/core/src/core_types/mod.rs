//! Core types and utilities

pub mod coord;
pub mod value;
pub mod vec3;

pub use coord::{Coord, CoordBBox};
pub use value::{Blendable, GridValue};
pub use vec3::{Vec3, Vec3i};
