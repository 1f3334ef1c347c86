//! Serialized layout of grid files.
//!
//! A file is a single JSON document:
//!
//! ```text
//! { "format_version": 1,
//!   "metadata": { key: { "type": ..., "value": ... }, ... },
//!   "grids": [ { "type": "float", "name": ..., "background": ...,
//!                "metadata": {...}, "leaves": [...], "tiles": [...] }, ... ] }
//! ```
//!
//! Leaves store their activation mask and only the values of active voxels,
//! in mask order. Leaves and tiles are written in ascending origin order so
//! the same grid always produces the same bytes.
//!
//! JSON has no NaN or infinity, so grids holding them are refused at write
//! time instead of producing a file that cannot be read back.

use serde::{Deserialize, Serialize};

use crate::core_types::{Coord, GridValue, Vec3};
use crate::grid::{AnyGrid, Grid, LeafNode, Tree, ValueMask, LEAF_DIM};
use crate::metadata::MetaMap;

pub const FORMAT_VERSION: u32 = 1;

/// Problems with the bytes of a grid file, independent of which file
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("unsupported format version {found} (expected {})", FORMAT_VERSION)]
    UnsupportedVersion { found: u32 },

    #[error("grid '{grid}': node at {origin} is not aligned to {}", LEAF_DIM)]
    MisalignedNode { grid: String, origin: Coord },

    #[error("grid '{grid}': leaf at {origin} has {found} values for {expected} active voxels")]
    LeafValueCount {
        grid: String,
        origin: Coord,
        expected: usize,
        found: usize,
    },

    #[error("grid '{grid}': non-finite value in node at {origin}")]
    NonFinite { grid: String, origin: Coord },

    #[error("grid '{grid}': non-finite background value")]
    NonFiniteBackground { grid: String },

    #[error("metadata '{key}' holds a non-finite number")]
    NonFiniteMetadata { key: String },
}

fn check_metadata_finite(metadata: &MetaMap) -> Result<(), FormatError> {
    match metadata.iter().find(|(_, value)| !value.is_finite()) {
        Some((key, _)) => Err(FormatError::NonFiniteMetadata {
            key: key.to_string(),
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct FileRecord {
    pub format_version: u32,
    #[serde(default)]
    pub metadata: MetaMap,
    #[serde(default)]
    pub grids: Vec<GridRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum GridRecord {
    Float(TypedGridRecord<f32>),
    Vec3s(TypedGridRecord<Vec3>),
    Int32(TypedGridRecord<i32>),
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TypedGridRecord<T> {
    name: String,
    background: T,
    #[serde(default)]
    metadata: MetaMap,
    #[serde(default)]
    leaves: Vec<LeafRecord<T>>,
    #[serde(default)]
    tiles: Vec<TileRecord<T>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LeafRecord<T> {
    origin: Coord,
    mask: [u64; 8],
    values: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TileRecord<T> {
    origin: Coord,
    value: T,
}

impl<T: GridValue> From<&Grid<T>> for TypedGridRecord<T> {
    fn from(grid: &Grid<T>) -> Self {
        let tree = grid.tree();
        Self {
            name: grid.name().to_string(),
            background: tree.background(),
            metadata: grid.metadata().clone(),
            leaves: tree
                .leaves()
                .into_iter()
                .filter(|leaf| !leaf.is_empty())
                .map(|leaf| LeafRecord {
                    origin: leaf.origin(),
                    mask: *leaf.mask().words(),
                    values: leaf.active_values(),
                })
                .collect(),
            tiles: tree
                .tiles()
                .into_iter()
                .map(|(origin, value)| TileRecord { origin, value })
                .collect(),
        }
    }
}

impl<T: GridValue> TypedGridRecord<T> {
    fn check_finite(&self) -> Result<(), FormatError> {
        if !self.background.is_finite_value() {
            return Err(FormatError::NonFiniteBackground {
                grid: self.name.clone(),
            });
        }
        let leaf_origins = self
            .leaves
            .iter()
            .filter(|leaf| !leaf.values.iter().all(T::is_finite_value))
            .map(|leaf| leaf.origin);
        let tile_origins = self
            .tiles
            .iter()
            .filter(|tile| !tile.value.is_finite_value())
            .map(|tile| tile.origin);
        if let Some(origin) = leaf_origins.chain(tile_origins).next() {
            return Err(FormatError::NonFinite {
                grid: self.name.clone(),
                origin,
            });
        }
        check_metadata_finite(&self.metadata)
    }

    fn into_grid(self) -> Result<Grid<T>, FormatError> {
        let TypedGridRecord {
            name,
            background,
            metadata,
            leaves,
            tiles,
        } = self;
        let misaligned = |origin: Coord| FormatError::MisalignedNode {
            grid: name.clone(),
            origin,
        };

        let mut tree = Tree::new(background);
        for record in leaves {
            if record.origin.aligned(LEAF_DIM) != record.origin {
                return Err(misaligned(record.origin));
            }
            let mask = ValueMask::from_words(record.mask);
            let leaf = LeafNode::from_active_values(record.origin, mask, &record.values, background)
                .ok_or_else(|| FormatError::LeafValueCount {
                    grid: name.clone(),
                    origin: record.origin,
                    expected: mask.count_on(),
                    found: record.values.len(),
                })?;
            tree.insert_leaf(leaf);
        }
        for tile in tiles {
            if tile.origin.aligned(LEAF_DIM) != tile.origin {
                return Err(misaligned(tile.origin));
            }
            tree.fill_tile(tile.origin, tile.value);
        }

        let mut grid = Grid::from_tree(name, tree);
        *grid.metadata_mut() = metadata;
        Ok(grid)
    }
}

impl From<&AnyGrid> for GridRecord {
    fn from(grid: &AnyGrid) -> Self {
        match grid {
            AnyGrid::Float(g) => GridRecord::Float(g.into()),
            AnyGrid::Vec3(g) => GridRecord::Vec3s(g.into()),
            AnyGrid::Int32(g) => GridRecord::Int32(g.into()),
        }
    }
}

impl TryFrom<GridRecord> for AnyGrid {
    type Error = FormatError;

    fn try_from(record: GridRecord) -> Result<Self, Self::Error> {
        Ok(match record {
            GridRecord::Float(r) => AnyGrid::Float(r.into_grid()?),
            GridRecord::Vec3s(r) => AnyGrid::Vec3(r.into_grid()?),
            GridRecord::Int32(r) => AnyGrid::Int32(r.into_grid()?),
        })
    }
}

impl GridRecord {
    fn check_finite(&self) -> Result<(), FormatError> {
        match self {
            GridRecord::Float(r) => r.check_finite(),
            GridRecord::Vec3s(r) => r.check_finite(),
            GridRecord::Int32(r) => r.check_finite(),
        }
    }
}

impl FileRecord {
    /// Build the record for `grids`
    ///
    /// # Errors
    /// Returns a `NonFinite*` error if any value or metadata number is NaN or
    /// infinite.
    pub fn new(grids: &[AnyGrid], metadata: &MetaMap) -> Result<Self, FormatError> {
        check_metadata_finite(metadata)?;
        let grids = grids
            .iter()
            .map(|grid| {
                let record = GridRecord::from(grid);
                record.check_finite().map(|()| record)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            format_version: FORMAT_VERSION,
            metadata: metadata.clone(),
            grids,
        })
    }

    /// Validate the header and rebuild every grid
    pub fn into_parts(self) -> Result<(MetaMap, Vec<AnyGrid>), FormatError> {
        if self.format_version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: self.format_version,
            });
        }
        let grids = self
            .grids
            .into_iter()
            .map(AnyGrid::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((self.metadata, grids))
    }
}
