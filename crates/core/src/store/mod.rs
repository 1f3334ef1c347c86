//! Reading and writing grid files.
//!
//! [`GridSource`] is the read contract the blend pipeline needs from a file.
//! [`GridFile`] implements it over the on-disk format in [`format`], with
//! transparent gzip compression for paths ending in `.gz`.
//!
//! Writes are staged in a temporary file next to the target and renamed over
//! it once complete, so a failed write never leaves a truncated file behind.

pub mod format;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::grid::AnyGrid;
use crate::metadata::MetaMap;

pub use format::{FormatError, FORMAT_VERSION};
use format::FileRecord;

/// Errors from opening, reading or writing grid files
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("grid '{name}' not found")]
    GridNotFound { name: String },
}

/// Read access to a set of named grids plus file-level metadata.
pub trait GridSource {
    fn metadata(&self) -> &MetaMap;

    /// Names of all grids, in file order
    fn grid_names(&self) -> Vec<String>;

    fn has_grid(&self, name: &str) -> bool {
        self.grid_names().iter().any(|n| n == name)
    }

    /// Read the first grid called `name`
    ///
    /// # Errors
    /// Returns [`StoreError::GridNotFound`] if no grid has that name.
    fn read_grid(&self, name: &str) -> Result<AnyGrid, StoreError>;
}

/// Grids and metadata of one file, held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridFile {
    metadata: MetaMap,
    grids: Vec<AnyGrid>,
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

fn read_record(path: &Path) -> Result<FileRecord, FormatError> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(serde_json::from_reader(BufReader::new(reader))?)
}

fn write_record(path: &Path, record: &FileRecord) -> Result<(), FormatError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir)?;
    {
        let writer = BufWriter::new(staged.as_file_mut());
        if is_gzip(path) {
            let mut encoder = GzEncoder::new(writer, Compression::default());
            serde_json::to_writer(&mut encoder, record)?;
            encoder.finish()?.flush()?;
        } else {
            let mut writer = writer;
            serde_json::to_writer(&mut writer, record)?;
            writer.flush()?;
        }
    }
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl GridFile {
    pub fn new(metadata: MetaMap, grids: Vec<AnyGrid>) -> Self {
        Self { metadata, grids }
    }

    /// Load a grid file from disk
    ///
    /// # Errors
    /// Returns [`StoreError::Open`] if the file cannot be read or is malformed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let (metadata, grids) = read_record(path)
            .and_then(FileRecord::into_parts)
            .map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        info!("Opened {} ({} grids)", path.display(), grids.len());
        Ok(Self { metadata, grids })
    }

    /// Write `grids` and file-level `metadata` to `path`
    ///
    /// # Errors
    /// Returns [`StoreError::Write`] on any I/O or serialization failure, or if
    /// a grid or metadata entry holds a NaN or infinite number. An existing
    /// file at `path` is left untouched on error.
    pub fn write_grids<P: AsRef<Path>>(
        path: P,
        grids: &[AnyGrid],
        metadata: &MetaMap,
    ) -> Result<(), StoreError> {
        let path = path.as_ref();
        FileRecord::new(grids, metadata)
            .and_then(|record| write_record(path, &record))
            .map_err(|source| StoreError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Wrote {} grids to {}", grids.len(), path.display());
        Ok(())
    }

    /// Write this file's grids and metadata to `path`
    ///
    /// # Errors
    /// See [`Self::write_grids`]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        Self::write_grids(path, &self.grids, &self.metadata)
    }

    pub fn push_grid(&mut self, grid: impl Into<AnyGrid>) {
        self.grids.push(grid.into());
    }
}

impl GridSource for GridFile {
    fn metadata(&self) -> &MetaMap {
        &self.metadata
    }

    fn grid_names(&self) -> Vec<String> {
        self.grids.iter().map(|g| g.name().to_string()).collect()
    }

    fn has_grid(&self, name: &str) -> bool {
        self.grids.iter().any(|g| g.name() == name)
    }

    fn read_grid(&self, name: &str) -> Result<AnyGrid, StoreError> {
        self.grids
            .iter()
            .find(|g| g.name() == name)
            .cloned()
            .ok_or_else(|| StoreError::GridNotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{Coord, Vec3, Vec3i};
    use crate::grid::Grid;
    use crate::metadata::keys;

    fn sample_file() -> GridFile {
        let mut metadata = MetaMap::new();
        metadata.insert(keys::SMOKE_RESOLUTION, Vec3i::new(16, 16, 32));

        let mut density = Grid::new("density", 0.0_f32);
        density.tree_mut().set_value_on(Coord::new(-3, 4, 9), 0.25);
        density.tree_mut().fill_tile(Coord::new(32, 0, 0), 1.0);
        density.add_stats_metadata();

        let mut velocity = Grid::new("velocity", Vec3::zeros());
        velocity
            .tree_mut()
            .set_value_on(Coord::new(1, 1, 1), Vec3::new(0.5, -1.0, 2.0));

        let mut flags = Grid::new("flags", -1_i32);
        flags.tree_mut().set_value_on(Coord::new(0, 0, 0), 7);

        let mut file = GridFile::new(metadata, Vec::new());
        file.push_grid(density);
        file.push_grid(velocity);
        file.push_grid(flags);
        file
    }

    #[test]
    fn test_save_and_open_plain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.grids");
        let file = sample_file();
        file.save(&path).unwrap();
        assert_eq!(GridFile::open(&path).unwrap(), file);
    }

    #[test]
    fn test_save_and_open_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.grids.gz");
        let file = sample_file();
        file.save(&path).unwrap();

        let mut magic = [0u8; 2];
        File::open(&path).unwrap().read_exact(&mut magic).unwrap();
        assert_eq!(magic, [0x1f, 0x8b]);
        assert_eq!(GridFile::open(&path).unwrap(), file);
    }

    #[test]
    fn test_output_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.grids");
        let b = dir.path().join("b.grids");
        let file = sample_file();
        file.save(&a).unwrap();
        GridFile::open(&a).unwrap().save(&b).unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
    }

    #[test]
    fn test_open_missing_file() {
        let err = GridFile::open("/nonexistent/frame.grids").unwrap_err();
        assert!(matches!(
            err,
            StoreError::Open {
                source: FormatError::Io(_),
                ..
            }
        ));
    }

    #[test]
    fn test_open_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.grids");
        std::fs::write(&path, b"not a grid file").unwrap();
        let err = GridFile::open(&path).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Open {
                source: FormatError::Json(_),
                ..
            }
        ));
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let err = sample_file()
            .save("/nonexistent/dir/out.grids")
            .unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
    }

    #[test]
    fn test_overflowed_grid_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.grids");
        let file = sample_file();
        file.save(&path).unwrap();

        // 2 * (1 - c) + 1 * c overflows f32 for c = 3e38
        let mut density = Grid::new("density", 0.0_f32);
        density.tree_mut().set_value_on(Coord::new(0, 0, 0), 2.0);
        let mut other = Grid::new("density", 0.0_f32);
        other.tree_mut().set_value_on(Coord::new(0, 0, 0), 1.0);
        crate::blend::blend_grids(&mut density, &other, 3.0e38);
        assert!(density.tree().value(Coord::new(0, 0, 0)).is_infinite());

        let err = GridFile::write_grids(&path, &[density.into()], &MetaMap::new()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Write {
                source: FormatError::NonFinite { .. },
                ..
            }
        ));

        // The previous file is intact and no staging file is left over
        assert_eq!(GridFile::open(&path).unwrap(), file);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.grids");
        sample_file().save(&path).unwrap();

        let smaller = GridFile::new(MetaMap::new(), Vec::new());
        smaller.save(&path).unwrap();
        assert_eq!(GridFile::open(&path).unwrap(), smaller);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_read_grid_by_name() {
        let file = sample_file();
        assert_eq!(file.grid_names(), vec!["density", "velocity", "flags"]);
        assert!(file.has_grid("velocity"));
        assert!(!file.has_grid("heat"));
        assert!(matches!(
            file.read_grid("heat"),
            Err(StoreError::GridNotFound { .. })
        ));
        assert_eq!(file.read_grid("flags").unwrap().name(), "flags");
    }
}
