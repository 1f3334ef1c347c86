//! Typed key/value metadata attached to grid files and individual grids.

pub mod verify;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core_types::{Vec3, Vec3i};

pub use verify::{
    check_metadata_match, verify_metadata_match, verify_required, BlendRequirements,
    MetadataError, RequiredKey,
};

/// Well-known metadata keys
pub mod keys {
    /// Domain resolution of the smoke simulation (vec3i)
    pub const SMOKE_RESOLUTION: &str = "blender/smoke/resolution";
    /// Domain shift of the smoke simulation (vec3i)
    pub const SMOKE_SHIFT: &str = "blender/smoke/shift";
    /// Bitmask of fluid fields present (int32)
    pub const SMOKE_FLUID_FIELDS: &str = "blender/smoke/fluid_fields";
    /// Bitmask of active fields (int32)
    pub const SMOKE_ACTIVE_FIELDS: &str = "blender/smoke/active_fields";

    pub const FILE_BBOX_MIN: &str = "file_bbox_min";
    pub const FILE_BBOX_MAX: &str = "file_bbox_max";
    pub const FILE_VOXEL_COUNT: &str = "file_voxel_count";
    pub const FILE_MEM_BYTES: &str = "file_mem_bytes";
    pub const VALUE_MIN: &str = "value_min";
    pub const VALUE_MAX: &str = "value_max";
    pub const VALUE_MEAN: &str = "value_mean";
}

/// Type tag of a [`MetaValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaKind {
    Bool,
    Int32,
    Int64,
    Float,
    Double,
    String,
    Vec3i,
    Vec3s,
}

impl MetaKind {
    pub fn name(self) -> &'static str {
        match self {
            MetaKind::Bool => "bool",
            MetaKind::Int32 => "int32",
            MetaKind::Int64 => "int64",
            MetaKind::Float => "float",
            MetaKind::Double => "double",
            MetaKind::String => "string",
            MetaKind::Vec3i => "vec3i",
            MetaKind::Vec3s => "vec3s",
        }
    }
}

impl fmt::Display for MetaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetaValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
    Vec3i(Vec3i),
    Vec3s(Vec3),
}

impl MetaValue {
    pub fn kind(&self) -> MetaKind {
        match self {
            MetaValue::Bool(_) => MetaKind::Bool,
            MetaValue::Int32(_) => MetaKind::Int32,
            MetaValue::Int64(_) => MetaKind::Int64,
            MetaValue::Float(_) => MetaKind::Float,
            MetaValue::Double(_) => MetaKind::Double,
            MetaValue::String(_) => MetaKind::String,
            MetaValue::Vec3i(_) => MetaKind::Vec3i,
            MetaValue::Vec3s(_) => MetaKind::Vec3s,
        }
    }

    /// False for floating-point values that JSON cannot represent
    pub fn is_finite(&self) -> bool {
        match self {
            MetaValue::Float(v) => v.is_finite(),
            MetaValue::Double(v) => v.is_finite(),
            MetaValue::Vec3s(v) => v.iter().all(|c| c.is_finite()),
            _ => true,
        }
    }
}

/// Rust types that map onto exactly one [`MetaValue`] variant.
pub trait MetaType: Sized {
    const KIND: MetaKind;

    /// Extract the value if `meta` holds this type
    fn from_meta(meta: &MetaValue) -> Option<Self>;

    fn into_meta(self) -> MetaValue;
}

macro_rules! impl_meta_type {
    ($ty:ty, $variant:ident) => {
        impl MetaType for $ty {
            const KIND: MetaKind = MetaKind::$variant;

            #[allow(clippy::clone_on_copy)]
            fn from_meta(meta: &MetaValue) -> Option<Self> {
                match meta {
                    MetaValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }

            fn into_meta(self) -> MetaValue {
                MetaValue::$variant(self)
            }
        }

        impl From<$ty> for MetaValue {
            fn from(v: $ty) -> Self {
                MetaValue::$variant(v)
            }
        }
    };
}

impl_meta_type!(bool, Bool);
impl_meta_type!(i32, Int32);
impl_meta_type!(i64, Int64);
impl_meta_type!(f32, Float);
impl_meta_type!(f64, Double);
impl_meta_type!(String, String);
impl_meta_type!(Vec3i, Vec3i);
impl_meta_type!(Vec3, Vec3s);

/// Why a typed metadata lookup failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetaLookupError {
    #[error("metadata key '{key}' not found")]
    Missing { key: String },

    #[error("metadata key '{key}' has type {found}, expected {expected}")]
    WrongType {
        key: String,
        expected: MetaKind,
        found: MetaKind,
    },
}

/// Ordered map from string keys to typed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaMap {
    entries: BTreeMap<String, MetaValue>,
}

impl MetaMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<MetaValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Typed lookup distinguishing a missing key from a key of the wrong type
    ///
    /// # Errors
    /// Returns [`MetaLookupError::Missing`] if `key` is absent and
    /// [`MetaLookupError::WrongType`] if it holds a different type than `T`.
    pub fn meta_value<T: MetaType>(&self, key: &str) -> Result<T, MetaLookupError> {
        let meta = self.entries.get(key).ok_or_else(|| MetaLookupError::Missing {
            key: key.to_string(),
        })?;
        T::from_meta(meta).ok_or_else(|| MetaLookupError::WrongType {
            key: key.to_string(),
            expected: T::KIND,
            found: meta.kind(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<MetaValue>> FromIterator<(K, V)> for MetaMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
