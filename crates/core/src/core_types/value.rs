//! Element types a sparse grid can store, and the subset that can be blended.

use std::fmt::Debug;
use std::ops::{Add, Mul};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::vec3::Vec3;

/// A value type that can live in a sparse grid.
pub trait GridValue:
    Copy + PartialEq + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Stable name of the element type, used in diagnostics and file headers
    const TYPE_NAME: &'static str;

    /// Additive identity, also the conventional background
    fn zero() -> Self;

    /// False if any component is NaN or infinite
    #[inline]
    fn is_finite_value(&self) -> bool {
        true
    }
}

/// Element types that support linear interpolation.
///
/// Integer grids are storable but deliberately not blendable.
pub trait Blendable: GridValue + Add<Output = Self> + Mul<f32, Output = Self> {
    /// `a * (1 - coeff) + b * coeff`, with no clamping of `coeff`
    #[inline]
    fn interpolate(a: Self, b: Self, coeff: f32) -> Self {
        a * (1.0 - coeff) + b * coeff
    }

    /// Scalar used for min/max/mean statistics (the value itself for scalars,
    /// the Euclidean length for vectors)
    fn scalar_summary(&self) -> f32;
}

impl GridValue for f32 {
    const TYPE_NAME: &'static str = "float";

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn is_finite_value(&self) -> bool {
        self.is_finite()
    }
}

impl Blendable for f32 {
    #[inline]
    fn scalar_summary(&self) -> f32 {
        *self
    }
}

impl GridValue for Vec3 {
    const TYPE_NAME: &'static str = "vec3s";

    #[inline]
    fn zero() -> Self {
        Vec3::zeros()
    }

    #[inline]
    fn is_finite_value(&self) -> bool {
        self.iter().all(|c| c.is_finite())
    }
}

impl Blendable for Vec3 {
    #[inline]
    fn scalar_summary(&self) -> f32 {
        self.norm()
    }
}

impl GridValue for i32 {
    const TYPE_NAME: &'static str = "int32";

    #[inline]
    fn zero() -> Self {
        0
    }
}
