//! Metadata compatibility checks between two grid files.
//!
//! Two simulation snapshots can only be blended when the keys describing
//! their domains agree. Each key check reports one of three causes on
//! failure: the values differ, a key has the wrong type, or a key is missing.

use serde::{Deserialize, Serialize};
use tracing::error;

use super::{keys, MetaKind, MetaLookupError, MetaMap, MetaType};
use crate::core_types::{Vec3, Vec3i};

/// Why a required key failed to match
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("mismatch in {key}")]
    Mismatch { key: String },

    #[error("wrong type of {key}: expected {expected}, found {found}")]
    WrongType {
        key: String,
        expected: MetaKind,
        found: MetaKind,
    },

    #[error("error retrieving {key}: key not found")]
    Missing { key: String },
}

impl MetadataError {
    pub fn key(&self) -> &str {
        match self {
            MetadataError::Mismatch { key }
            | MetadataError::WrongType { key, .. }
            | MetadataError::Missing { key } => key,
        }
    }
}

impl From<MetaLookupError> for MetadataError {
    fn from(e: MetaLookupError) -> Self {
        match e {
            MetaLookupError::Missing { key } => MetadataError::Missing { key },
            MetaLookupError::WrongType {
                key,
                expected,
                found,
            } => MetadataError::WrongType {
                key,
                expected,
                found,
            },
        }
    }
}

/// Check that `key` exists in both maps as a `T` and holds equal values.
///
/// # Errors
/// Returns the first failure cause; the first map is consulted before the second.
pub fn check_metadata_match<T>(
    metadata1: &MetaMap,
    metadata2: &MetaMap,
    key: &str,
) -> Result<(), MetadataError>
where
    T: MetaType + PartialEq,
{
    let val1 = metadata1.meta_value::<T>(key)?;
    let val2 = metadata2.meta_value::<T>(key)?;
    if val1 == val2 {
        Ok(())
    } else {
        Err(MetadataError::Mismatch {
            key: key.to_string(),
        })
    }
}

/// Boolean form of [`check_metadata_match`] that logs the failure cause.
pub fn verify_metadata_match<T>(metadata1: &MetaMap, metadata2: &MetaMap, key: &str) -> bool
where
    T: MetaType + PartialEq,
{
    match check_metadata_match::<T>(metadata1, metadata2, key) {
        Ok(()) => true,
        Err(e) => {
            error!("{e}");
            false
        }
    }
}

/// A key that must match between two inputs, with its expected type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredKey {
    pub key: String,
    pub kind: MetaKind,
}

impl RequiredKey {
    pub fn new(key: impl Into<String>, kind: MetaKind) -> Self {
        Self {
            key: key.into(),
            kind,
        }
    }
}

/// Check one required key, dispatching on its declared type.
///
/// # Errors
/// See [`check_metadata_match`].
pub fn verify_required(
    metadata1: &MetaMap,
    metadata2: &MetaMap,
    required: &RequiredKey,
) -> Result<(), MetadataError> {
    let key = required.key.as_str();
    match required.kind {
        MetaKind::Bool => check_metadata_match::<bool>(metadata1, metadata2, key),
        MetaKind::Int32 => check_metadata_match::<i32>(metadata1, metadata2, key),
        MetaKind::Int64 => check_metadata_match::<i64>(metadata1, metadata2, key),
        MetaKind::Float => check_metadata_match::<f32>(metadata1, metadata2, key),
        MetaKind::Double => check_metadata_match::<f64>(metadata1, metadata2, key),
        MetaKind::String => check_metadata_match::<String>(metadata1, metadata2, key),
        MetaKind::Vec3i => check_metadata_match::<Vec3i>(metadata1, metadata2, key),
        MetaKind::Vec3s => check_metadata_match::<Vec3>(metadata1, metadata2, key),
    }
}

/// Ordered set of keys that must match for two inputs to be blend-compatible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlendRequirements {
    keys: Vec<RequiredKey>,
}

impl BlendRequirements {
    pub fn new(keys: Vec<RequiredKey>) -> Self {
        Self { keys }
    }

    /// No keys required; every pair of inputs is compatible
    pub fn none() -> Self {
        Self { keys: Vec::new() }
    }

    /// Domain keys written by the smoke simulation cache
    pub fn smoke() -> Self {
        Self::new(vec![
            RequiredKey::new(keys::SMOKE_RESOLUTION, MetaKind::Vec3i),
            RequiredKey::new(keys::SMOKE_SHIFT, MetaKind::Vec3i),
            RequiredKey::new(keys::SMOKE_FLUID_FIELDS, MetaKind::Int32),
            RequiredKey::new(keys::SMOKE_ACTIVE_FIELDS, MetaKind::Int32),
        ])
    }

    pub fn keys(&self) -> &[RequiredKey] {
        &self.keys
    }

    /// Check every key in order, stopping at the first failure.
    ///
    /// # Errors
    /// Returns the failure of the first key that does not match.
    pub fn verify(&self, metadata1: &MetaMap, metadata2: &MetaMap) -> Result<(), MetadataError> {
        self.keys
            .iter()
            .try_for_each(|required| verify_required(metadata1, metadata2, required))
    }
}

impl Default for BlendRequirements {
    fn default() -> Self {
        Self::smoke()
    }
}
