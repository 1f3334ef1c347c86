//! Error types for blend runs.

use std::path::PathBuf;

use crate::metadata::MetadataError;
use crate::store::StoreError;

/// Failure to read or parse a [`crate::blend::BlendConfig`] file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not access config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Every way a blend run can fail.
///
/// Element-type mismatches between a pair of grids are not errors; the pair
/// is skipped and reported in [`crate::pipeline::BlendReport`].
#[derive(Debug, thiserror::Error)]
pub enum BlendError {
    /// An input could not be opened or an output could not be written
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The inputs do not describe compatible simulations
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// A grid of the first input has no same-named grid in the second
    #[error("cannot find second grid {name}")]
    FieldNotFound { name: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience alias for blend results.
pub type Result<T> = std::result::Result<T, BlendError>;
